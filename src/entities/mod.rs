use crate::barrier::CarrierKind;
use crate::world::WorldState;

macro_rules! impl_record {
    ($ty:ty) => {
        impl crate::entity_array::Record for $ty {
            fn slot(&self) -> &crate::entity_array::Slot {
                &self.slot
            }
            fn slot_mut(&mut self) -> &mut crate::entity_array::Slot {
                &mut self.slot
            }
        }
    };
}
pub(crate) use impl_record;

pub mod barrier;
pub mod coin;
pub mod crystal;
pub mod door;
pub mod fireball;
pub mod player;
pub mod walker;

/// Every entity kind that can hold a barrier shut.
pub const CARRIERS: &[CarrierKind<WorldState>] = &[
    CarrierKind {
        name: "walker",
        holds_tag: walker::holds_tag,
    },
    CarrierKind {
        name: "crystal",
        holds_tag: crystal::holds_tag,
    },
];

/// Hitbox sizes as fractions of the tile size.
pub(crate) fn scaled(tile_size: f32, w: f32, h: f32) -> (f32, f32) {
    (tile_size * w, tile_size * h)
}
