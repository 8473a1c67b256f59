const DEFAULT_VIEW_WIDTH: f32 = 320.0;
const DEFAULT_VIEW_HEIGHT: f32 = 240.0;

/// Top-left anchored view rectangle in pixel space.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraView {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Fraction of the remaining distance covered each tick. 1.0 snaps.
    pub follow_speed: f32,
}

impl Default for CameraView {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: DEFAULT_VIEW_WIDTH,
            height: DEFAULT_VIEW_HEIGHT,
            follow_speed: 0.2,
        }
    }
}

impl CameraView {
    /// Eases toward centring `(tx, ty)`, then clamps to the map.
    pub fn follow(&mut self, tx: f32, ty: f32, map_width: f32, map_height: f32) {
        let goal_x = tx - self.width * 0.5;
        let goal_y = ty - self.height * 0.5;
        let t = self.follow_speed.clamp(0.0, 1.0);
        self.x += (goal_x - self.x) * t;
        self.y += (goal_y - self.y) * t;
        self.clamp_to(map_width, map_height);
    }

    /// Centres immediately, e.g. after a map transition.
    pub fn snap(&mut self, tx: f32, ty: f32, map_width: f32, map_height: f32) {
        self.x = tx - self.width * 0.5;
        self.y = ty - self.height * 0.5;
        self.clamp_to(map_width, map_height);
    }

    /// Maps smaller than the view are centred instead.
    fn clamp_to(&mut self, map_width: f32, map_height: f32) {
        self.x = clamp_axis(self.x, self.width, map_width);
        self.y = clamp_axis(self.y, self.height, map_height);
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

fn clamp_axis(pos: f32, view: f32, map: f32) -> f32 {
    if map <= view {
        (map - view) * 0.5
    } else {
        pos.clamp(0.0, map - view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snap_clamps_to_map_edges() {
        let mut cam = CameraView::default();
        cam.snap(10.0, 10.0, 1000.0, 800.0);
        assert_eq!((cam.x, cam.y), (0.0, 0.0));
        cam.snap(990.0, 790.0, 1000.0, 800.0);
        assert_eq!((cam.x, cam.y), (680.0, 560.0));
    }

    #[test]
    fn small_maps_are_centred() {
        let mut cam = CameraView::default();
        cam.snap(50.0, 50.0, 160.0, 240.0);
        assert_eq!(cam.x, -80.0);
        assert_eq!(cam.y, 0.0);
    }

    #[test]
    fn follow_eases_toward_target() {
        let mut cam = CameraView {
            follow_speed: 0.5,
            ..Default::default()
        };
        cam.follow(560.0, 120.0, 2000.0, 240.0);
        assert_eq!(cam.x, 200.0);
        cam.follow(560.0, 120.0, 2000.0, 240.0);
        assert_eq!(cam.x, 300.0);
        assert!(cam.contains(560.0, 120.0));
    }
}
