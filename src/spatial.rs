//! Pose, camera and hit-test types on top of `glam`.
//!
//! Right-handed coordinates with +Y up. Cameras look down -Z, so [`FORWARD`]
//! is `(0, 0, -1)` and a flat object "faces" along its local +Z axis.

pub use glam::{Quat, Vec3};

use glam::{Mat3, Vec4};
use serde::Serialize;

const EPSILON: f32 = 1e-6;

pub const UP: Vec3 = Vec3::Y;
/// Viewing direction of an unrotated camera
pub const FORWARD: Vec3 = Vec3::NEG_Z;

/// Unit quaternion, or identity when `q` is degenerate
pub fn normalize_or_identity(q: Quat) -> Quat {
    Vec4::from(q)
        .try_normalize()
        .map_or(Quat::IDENTITY, Quat::from_vec4)
}

/// Direction a camera with this orientation looks along
pub fn forward_of(orientation: Quat) -> Vec3 {
    orientation * FORWARD
}

/// Orientation that points the local +Z axis from `eye` towards `target`
/// while keeping local +Y as close to `up` as possible.
///
/// Returns `None` when the points coincide or the direction is parallel
/// to `up`, since no unique basis exists.
pub fn look_rotation(eye: Vec3, target: Vec3, up: Vec3) -> Option<Quat> {
    let z = (target - eye).try_normalize()?;
    let x = up.cross(z).try_normalize()?;
    let y = z.cross(x);
    Some(Quat::from_mat3(&Mat3::from_cols(x, y, z)).normalize())
}

/// Smallest rotation angle (radians) between two orientations
pub fn angle_between(a: Quat, b: Quat) -> f32 {
    // atan2 stays precise for nearly equal rotations where acos does not
    let d = a.conjugate() * b;
    2.0 * d.xyz().length().atan2(d.w.abs())
}

/// Position, orientation and scale of a tracked object
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
    pub scale: Vec3,
}

impl Pose {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

/// Camera state supplied by the rendering frontend each frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub orientation: Quat,
    pub forward: Vec3,
}

impl CameraPose {
    /// Camera whose forward vector is derived from its orientation
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
            forward: forward_of(orientation),
        }
    }

    /// Unit viewing direction. A degenerate `forward` falls back to the
    /// orientation's forward axis, then to [`FORWARD`].
    pub fn view_direction(&self) -> Vec3 {
        self.forward
            .try_normalize()
            .or_else(|| forward_of(normalize_or_identity(self.orientation)).try_normalize())
            .unwrap_or(FORWARD)
    }
}

impl Default for CameraPose {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY)
    }
}

/// Ray query capability provided by the hit-testing layer
pub trait HitTest {
    /// Distance along `direction` (unit length) to the first hit, if any
    fn ray_distance(&self, origin: Vec3, direction: Vec3) -> Option<f32>;

    fn ray_hits(&self, origin: Vec3, direction: Vec3) -> bool {
        self.ray_distance(origin, direction).is_some()
    }
}

/// Simple bounding volumes used for hover detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bounds {
    Sphere { center: Vec3, radius: f32 },
    Aabb { min: Vec3, max: Vec3 },
}

impl Bounds {
    pub fn sphere(center: Vec3, radius: f32) -> Self {
        Self::Sphere { center, radius }
    }

    pub fn aabb_centered(center: Vec3, half_extents: Vec3) -> Self {
        Self::Aabb {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Places object-local bounds at a live pose (translation and uniform
    /// scale by the largest scale component; rotation is ignored).
    pub fn placed_at(&self, pose: &Pose) -> Self {
        let s = pose.scale.max_element().abs();
        match *self {
            Bounds::Sphere { center, radius } => Bounds::Sphere {
                center: pose.position + center * s,
                radius: radius * s,
            },
            Bounds::Aabb { min, max } => Bounds::Aabb {
                min: pose.position + min * s,
                max: pose.position + max * s,
            },
        }
    }
}

impl HitTest for Bounds {
    fn ray_distance(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        let dir = direction.try_normalize()?;
        match *self {
            Bounds::Sphere { center, radius } => {
                let oc = origin - center;
                let b = oc.dot(dir);
                let c = oc.length_squared() - radius * radius;
                let disc = b * b - c;
                if disc < 0.0 {
                    return None;
                }
                let root = disc.sqrt();
                [-b - root, -b + root].into_iter().find(|t| *t >= 0.0)
            }
            Bounds::Aabb { min, max } => {
                let (o, d) = (origin.to_array(), dir.to_array());
                let (lo, hi) = (min.to_array(), max.to_array());
                let mut t_min = f32::NEG_INFINITY;
                let mut t_max = f32::INFINITY;
                for axis in 0..3 {
                    if d[axis].abs() < EPSILON {
                        if o[axis] < lo[axis] || o[axis] > hi[axis] {
                            return None;
                        }
                        continue;
                    }
                    let inv = 1.0 / d[axis];
                    let mut t1 = (lo[axis] - o[axis]) * inv;
                    let mut t2 = (hi[axis] - o[axis]) * inv;
                    if t1 > t2 {
                        std::mem::swap(&mut t1, &mut t2);
                    }
                    t_min = t_min.max(t1);
                    t_max = t_max.min(t2);
                }
                if t_max < t_min.max(0.0) {
                    None
                } else {
                    Some(t_min.max(0.0))
                }
            }
        }
    }
}
