//! View framing and camera poses.

use glam::{Mat4, Vec2, Vec3};

/// Computes the vertical view extent at the focus point that keeps the
/// bounding sphere of a box visible.
///
/// The sphere radius is the full diagonal of the box, which is conservative.
/// For portrait viewports (`aspect_ratio < 1`) the result averages the
/// landscape extent and the extent widened by the aspect ratio. This is an
/// approximation, not an exact fit.
#[must_use]
pub fn frame_bounding_sphere(
    extent: Vec3,
    y_fov_degrees: f32,
    aspect_ratio: f32,
    zoom: f32,
) -> f32 {
    let radius = extent.length();
    let angle = (90.0 - y_fov_degrees * 0.5).to_radians();
    let extent_factor = (radius / angle.sin()) * zoom;

    if aspect_ratio >= 1.0 {
        extent_factor
    } else {
        (extent_factor + extent_factor / aspect_ratio) / 2.0
    }
}

/// Horizontal field of view in degrees for a vertical one and an aspect ratio.
#[must_use]
pub fn horizontal_fov_degrees(y_fov_degrees: f32, aspect_ratio: f32) -> f32 {
    let half_y = (y_fov_degrees * 0.5).to_radians();
    (2.0 * (half_y.tan() * aspect_ratio).atan()).to_degrees()
}

/// Frames a volume for a fixed perspective camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewFramer {
    /// Vertical field of view in degrees.
    pub y_fov_degrees: f32,
    /// Aspect ratio (width / height).
    pub aspect_ratio: f32,
}

impl ViewFramer {
    /// Creates a framer.
    #[must_use]
    pub fn new(y_fov_degrees: f32, aspect_ratio: f32) -> Self {
        Self {
            y_fov_degrees,
            aspect_ratio,
        }
    }

    /// Returns the vertical extent at focus for a box extent and zoom factor.
    #[must_use]
    pub fn frame(&self, extent: Vec3, zoom: f32) -> f32 {
        frame_bounding_sphere(extent, self.y_fov_degrees, self.aspect_ratio, zoom)
    }

    /// Returns the horizontal field of view in degrees.
    #[must_use]
    pub fn x_fov_degrees(&self) -> f32 {
        horizontal_fov_degrees(self.y_fov_degrees, self.aspect_ratio)
    }

    /// Builds the camera looking at `focus` along `view_dir`, framed for a box
    /// of the given extent.
    #[must_use]
    pub fn camera_frame(
        &self,
        focus: Vec3,
        view_dir: Vec3,
        up: Vec3,
        extent: Vec3,
        zoom: f32,
    ) -> CameraFrame {
        let extent_at_focus = self.frame(extent, zoom);
        let mut frame =
            CameraFrame::look_at_focus(focus, view_dir, up, self.y_fov_degrees, extent_at_focus);
        frame.zoom = zoom;
        frame
    }
}

/// Orthonormal camera basis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBasis {
    /// Viewing direction, from eye to focus.
    pub forward: Vec3,
    /// Right direction (forward x up).
    pub right: Vec3,
    /// Re-orthogonalized up direction (right x forward).
    pub up: Vec3,
}

/// The camera of a single capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    /// Camera position in world space.
    pub eye: Vec3,
    /// Point the camera is looking at.
    pub focus: Vec3,
    /// Requested up direction; not necessarily orthogonal to the view.
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub y_fov_degrees: f32,
    /// Vertical extent visible at the focus distance.
    pub extent_at_focus: f32,
    /// Zoom factor the extent was computed with.
    pub zoom: f32,
    /// Pan offset applied to this frame.
    pub pan: Vec2,
}

impl CameraFrame {
    /// Places the eye along `-view_dir` from `focus` at the distance where
    /// `extent_at_focus` fills the vertical field of view.
    #[must_use]
    pub fn look_at_focus(
        focus: Vec3,
        view_dir: Vec3,
        up: Vec3,
        y_fov_degrees: f32,
        extent_at_focus: f32,
    ) -> Self {
        let depth = depth_of_focus(extent_at_focus, y_fov_degrees);
        Self {
            eye: focus - view_dir.normalize() * depth,
            focus,
            up,
            y_fov_degrees,
            extent_at_focus,
            zoom: 1.0,
            pan: Vec2::ZERO,
        }
    }

    /// Distance between eye and focus.
    #[must_use]
    pub fn focus_distance(&self) -> f32 {
        self.eye.distance(self.focus)
    }

    /// Returns the camera's forward direction.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        (self.focus - self.eye).normalize()
    }

    /// Returns the orthonormal camera basis.
    ///
    /// When the view direction is parallel to the requested up vector an
    /// arbitrary perpendicular right vector is used.
    #[must_use]
    pub fn basis(&self) -> CameraBasis {
        let forward = self.forward();
        let right = forward
            .cross(self.up)
            .try_normalize()
            .unwrap_or_else(|| forward.any_orthonormal_vector());
        let up = right.cross(forward).normalize();
        CameraBasis { forward, right, up }
    }

    /// Pans the camera parallel to the image plane.
    pub fn pan(&mut self, delta_x: f32, delta_y: f32) {
        let basis = self.basis();
        let offset = basis.right * delta_x + basis.up * delta_y;
        self.eye += offset;
        self.focus += offset;
        self.pan += Vec2::new(delta_x, delta_y);
    }

    /// Returns the view matrix.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.focus, self.basis().up)
    }

    /// Returns the perspective projection matrix.
    #[must_use]
    pub fn projection_matrix(&self, aspect_ratio: f32, near: f32, far: f32) -> Mat4 {
        Mat4::perspective_rh(self.y_fov_degrees.to_radians(), aspect_ratio, near, far)
    }

    /// Returns the camera-to-world pose in the NeRF dataset convention.
    ///
    /// Columns are right, up, backward and position, with the world axes
    /// remapped so that world +Y becomes the dataset's +Z and world +Z becomes
    /// the dataset's -Y. Rows are returned in order.
    #[must_use]
    pub fn pose_matrix(&self) -> [[f32; 4]; 4] {
        let CameraBasis { forward, right, up } = self.basis();
        let eye = self.eye;
        [
            [right.x, up.x, -forward.x, eye.x],
            [-right.z, -up.z, forward.z, -eye.z],
            [right.y, up.y, -forward.y, eye.y],
            [0.0, 0.0, 0.0, 1.0],
        ]
    }
}

/// Distance from the eye at which `extent_at_focus` spans the vertical field
/// of view.
#[must_use]
pub fn depth_of_focus(extent_at_focus: f32, y_fov_degrees: f32) -> f32 {
    0.5 * extent_at_focus / (y_fov_degrees * 0.5).to_radians().tan()
}
