use glam::{Mat3, Vec2};
use stagecraft_common::Frustum;

pub const MIN_ZOOM: f32 = 0.05;
pub const MAX_ZOOM: f32 = 20.0;

/// Orthographic 2D camera.
///
/// The visible vertical extent is `units_per_screen_height * pixel_scale /
/// zoom`. `pixel_scale` tracks viewport height against the height seen on
/// first use, so resizing the backing store keeps on-screen sizes stable
/// while zoom still scales them.
///
/// View, projection, and frustum are cached behind a dirty flag and rebuilt
/// lazily on the next query.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec2,
    zoom: f32,
    units_per_screen_height: f32,
    reference_viewport_height: Option<f32>,
    viewport_height: f32,
    pixel_scale: f32,
    dirty: bool,
    cached_aspect: f32,
    view: Mat3,
    projection: Mat3,
    view_projection: Mat3,
    frustum: Frustum,
}

impl Camera {
    pub fn new(units_per_screen_height: f32) -> Self {
        Self {
            position: Vec2::ZERO,
            zoom: 1.0,
            units_per_screen_height,
            reference_viewport_height: None,
            viewport_height: 0.0,
            pixel_scale: 1.0,
            dirty: true,
            cached_aspect: 0.0,
            view: Mat3::IDENTITY,
            projection: Mat3::IDENTITY,
            view_projection: Mat3::IDENTITY,
            frustum: Frustum::default(),
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn units_per_screen_height(&self) -> f32 {
        self.units_per_screen_height
    }

    pub fn pixel_scale(&self) -> f32 {
        self.pixel_scale
    }

    pub fn reference_viewport_height(&self) -> Option<f32> {
        self.reference_viewport_height
    }

    pub fn set_position(&mut self, position: Vec2) {
        if self.position != position {
            self.position = position;
            self.dirty = true;
        }
    }

    /// Clamped to `[MIN_ZOOM, MAX_ZOOM]`.
    pub fn set_zoom(&mut self, zoom: f32) {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if self.zoom != zoom {
            self.zoom = zoom;
            self.dirty = true;
        }
    }

    pub fn set_units_per_screen_height(&mut self, units: f32) {
        self.units_per_screen_height = units;
        self.dirty = true;
    }

    /// The first call fixes the reference height; later height changes
    /// rescale `pixel_scale`.
    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let h = height as f32;
        match self.reference_viewport_height {
            None => {
                self.reference_viewport_height = Some(h);
                self.viewport_height = h;
                self.pixel_scale = 1.0;
                self.dirty = true;
            }
            Some(reference) if h != self.viewport_height => {
                self.viewport_height = h;
                self.pixel_scale = h / reference;
                self.dirty = true;
            }
            Some(_) => {}
        }
    }

    /// World-space height of the view.
    pub fn visible_height(&self) -> f32 {
        self.units_per_screen_height * self.pixel_scale / self.zoom
    }

    /// Half width and half height in world units.
    pub fn half_extents(&self, aspect: f32) -> Vec2 {
        let half_height = self.visible_height() * 0.5;
        Vec2::new(half_height * aspect, half_height)
    }

    /// Screen pixels covered by one world unit at the current viewport.
    pub fn pixels_per_unit(&self) -> f32 {
        self.viewport_height / self.visible_height()
    }

    fn rebuild(&mut self, aspect: f32) {
        let half = self.half_extents(aspect);
        self.view = Mat3::from_translation(-self.position);
        self.projection = Mat3::from_scale(Vec2::new(1.0 / half.x, 1.0 / half.y));
        self.view_projection = self.projection * self.view;
        self.cached_aspect = aspect;
        self.dirty = false;
    }

    fn refresh(&mut self, aspect: f32) {
        if self.dirty || self.cached_aspect != aspect {
            self.rebuild(aspect);
        }
    }

    pub fn view_matrix(&mut self, aspect: f32) -> Mat3 {
        self.refresh(aspect);
        self.view
    }

    pub fn projection_matrix(&mut self, aspect: f32) -> Mat3 {
        self.refresh(aspect);
        self.projection
    }

    /// Column-major `P * V`.
    pub fn view_projection_matrix(&mut self, aspect: f32) -> Mat3 {
        self.refresh(aspect);
        self.view_projection
    }

    /// Visible world rectangle for `aspect`. The cached frustum is updated
    /// in place.
    pub fn frustum(&mut self, aspect: f32) -> &Frustum {
        let half = self.half_extents(aspect);
        self.frustum.set(self.position, half.x, half.y);
        &self.frustum
    }

    /// Pixel coordinates (origin top-left, y down) to world space.
    pub fn screen_to_world(&self, screen: Vec2, width: f32, height: f32) -> Vec2 {
        let half = self.half_extents(width / height);
        let ndc = Vec2::new(screen.x / width * 2.0 - 1.0, 1.0 - screen.y / height * 2.0);
        self.position + ndc * half
    }

    /// World space to pixel coordinates (origin top-left, y down).
    pub fn world_to_screen(&self, world: Vec2, width: f32, height: f32) -> Vec2 {
        let half = self.half_extents(width / height);
        let ndc = (world - self.position) / half;
        Vec2::new((ndc.x + 1.0) * 0.5 * width, (1.0 - ndc.y) * 0.5 * height)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(10.0)
    }
}
