use rand::rngs::SmallRng;
use rand::Rng;

use crate::entities::impl_record;
use crate::entity_array::{EntityArray, Slot};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum EffectKind {
    BarrierBreak,
    EnemyDeath,
    CrystalShatter,
    Hurt,
    Sparkle,
    Fizzle,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffectPreset {
    pub count: u32,
    pub speed_min: f32,
    pub speed_max: f32,
    pub lifetime: u32,
    pub gravity_multiplier: f32,
}

impl EffectKind {
    pub fn preset(self) -> EffectPreset {
        match self {
            EffectKind::BarrierBreak => EffectPreset {
                count: 12,
                speed_min: 1.0,
                speed_max: 4.0,
                lifetime: 40,
                gravity_multiplier: 0.5,
            },
            EffectKind::EnemyDeath => EffectPreset {
                count: 10,
                speed_min: 1.0,
                speed_max: 3.0,
                lifetime: 30,
                gravity_multiplier: 0.3,
            },
            EffectKind::CrystalShatter => EffectPreset {
                count: 8,
                speed_min: 2.0,
                speed_max: 5.0,
                lifetime: 25,
                gravity_multiplier: 0.4,
            },
            EffectKind::Hurt => EffectPreset {
                count: 6,
                speed_min: 0.5,
                speed_max: 2.0,
                lifetime: 20,
                gravity_multiplier: 0.0,
            },
            EffectKind::Sparkle => EffectPreset {
                count: 5,
                speed_min: 0.5,
                speed_max: 1.5,
                lifetime: 18,
                gravity_multiplier: -0.1,
            },
            EffectKind::Fizzle => EffectPreset {
                count: 4,
                speed_min: 0.2,
                speed_max: 1.0,
                lifetime: 12,
                gravity_multiplier: 0.0,
            },
        }
    }
}

/// Cosmetic only. Removed immediately when it expires.
#[derive(Clone, Debug, Default)]
pub struct Particle {
    pub slot: Slot,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub life: u32,
    pub gravity_multiplier: f32,
}

impl_record!(Particle);

/// Fire-and-forget burst. Stops quietly once the array is full.
pub fn spawn_effect(
    particles: &mut EntityArray<Particle>,
    rng: &mut SmallRng,
    kind: EffectKind,
    x: f32,
    y: f32,
) -> u32 {
    let preset = kind.preset();
    let mut spawned = 0;
    for _ in 0..preset.count {
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let speed = rng.gen_range(preset.speed_min..=preset.speed_max);
        let particle = Particle {
            x,
            y,
            vx: angle.cos() * speed,
            vy: angle.sin() * speed,
            life: preset.lifetime,
            gravity_multiplier: preset.gravity_multiplier,
            ..Default::default()
        };
        if particles.add(particle).is_err() {
            break;
        }
        spawned += 1;
    }
    spawned
}

pub fn update_particles(particles: &mut EntityArray<Particle>, gravity: f32) {
    // Walk backwards so the record swapped into a hole was already updated.
    for i in (0..particles.len()).rev() {
        let expired = match particles.get_mut(i) {
            Some(p) => {
                p.vy += gravity * p.gravity_multiplier;
                p.x += p.vx;
                p.y += p.vy;
                p.life = p.life.saturating_sub(1);
                p.life == 0
            }
            None => false,
        };
        if expired {
            particles.delete_at(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn burst_respects_capacity() {
        let mut particles = EntityArray::create("particle", 5).unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        let spawned = spawn_effect(&mut particles, &mut rng, EffectKind::BarrierBreak, 10.0, 10.0);
        assert_eq!(spawned, 5);
        assert!(particles.is_full());
    }

    #[test]
    fn expired_particles_are_removed_immediately() {
        let mut particles = EntityArray::create("particle", 64).unwrap();
        let mut rng = SmallRng::seed_from_u64(2);
        spawn_effect(&mut particles, &mut rng, EffectKind::Fizzle, 0.0, 0.0);
        spawn_effect(&mut particles, &mut rng, EffectKind::Sparkle, 0.0, 0.0);
        let fizzle_life = EffectKind::Fizzle.preset().lifetime;
        for _ in 0..fizzle_life {
            update_particles(&mut particles, 0.5);
        }
        assert_eq!(particles.len(), EffectKind::Sparkle.preset().count as usize);
        assert!(particles.indices_consistent());
        for _ in 0..EffectKind::Sparkle.preset().lifetime {
            update_particles(&mut particles, 0.5);
        }
        assert!(particles.is_empty());
    }
}
