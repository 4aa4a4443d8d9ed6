//! Block selection by ray traversal.

mod raycast;

pub use raycast::{
    BlockAccess, HitKind, HitResult, MAX_RAY_STEPS, MAX_REACH_DISTANCE, look_direction, raycast,
    raycast_with_limit,
};
