//! Geometry

// Define macros for property based testing.
#[cfg(test)]
#[macro_export]
macro_rules! prop_vector3f {
    ($name: ident, $r: expr) => {
        prop_compose! {
            fn $name()(x in $r, y in $r, z in $r) -> Vector3f {
                Vector3f { x, y, z }
            }
        }
    };
}

#[cfg(test)]
#[macro_export]
macro_rules! prop_point3f {
    ($name: ident, $r: expr) => {
        prop_compose! {
            fn $name()(x in $r, y in $r, z in $r) -> Point3f {
                Point3f { x, y, z }
            }
        }
    };
}

mod bounds3;
mod normal3;
mod point2;
mod point3;
mod ray;
mod vector3;

// Re-export.
pub use bounds3::*;
pub use normal3::*;
pub use point2::*;
pub use point3::*;
pub use ray::*;
pub use vector3::*;
