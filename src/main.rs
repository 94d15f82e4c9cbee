//! Demo renderer: solves a Cornell-box style scene with the hierarchical
//! radiosity integrator, shades it by casting one ray per pixel into the
//! refined leaf patches, and writes the picture plus a gather-link overlay
//! as PNGs.

#[macro_use]
extern crate log;

use clap::Parser;
use itertools::iproduct;
use radiosity_rs::accelerators::BVHAccel;
use radiosity_rs::cameras::Camera;
use radiosity_rs::core::common::*;
use radiosity_rs::core::geometry::*;
use radiosity_rs::core::image::RGBImage;
use radiosity_rs::core::progress::LogProgress;
use radiosity_rs::core::spectrum::Spectrum;
use radiosity_rs::core::triangle::Triangle;
use radiosity_rs::integrators::radiosity::{HierarchicalRadiosity, RadiosityConfig};

/// Hierarchical radiosity demo renderer.
#[derive(Parser)]
#[command(version, about)]
struct Options {
    /// Image width in pixels.
    #[arg(long, default_value_t = 512)]
    width: usize,

    /// Image height in pixels.
    #[arg(long, default_value_t = 512)]
    height: usize,

    /// Link acceptance threshold on the estimated form factor.
    #[arg(long, default_value_t = 0.04)]
    f_eps: Float,

    /// Minimum allowed patch area.
    #[arg(long, default_value_t = 1e-3)]
    a_eps: Float,

    /// Maximum allowed unresolved radiant power per link.
    #[arg(long, default_value_t = 1e-2)]
    bf_eps: Float,

    /// Sweeps per solve call.
    #[arg(long, default_value_t = 16)]
    iterations: usize,

    /// Residual threshold for early sweep termination.
    #[arg(long)]
    residual_eps: Option<Float>,

    /// Output path for the shaded image.
    #[arg(long, default_value = "radiosity.png")]
    output: String,

    /// Output path for the gather-link overlay.
    #[arg(long, default_value = "links.png")]
    links_output: String,
}

fn main() {
    env_logger::init();

    let options = Options::parse();
    if let Err(e) = render(&options) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn render(options: &Options) -> Result<(), String> {
    let accel = BVHAccel::new(cornell_box(), 4);
    info!("Scene holds {} triangles", accel.num_triangles());

    let config = RadiosityConfig {
        f_eps: options.f_eps,
        a_eps: options.a_eps,
        bf_eps: options.bf_eps,
        max_iterations: options.iterations,
        residual_eps: options.residual_eps,
    };
    let mut solver = HierarchicalRadiosity::new(&accel, config)
        .with_progress(Box::new(LogProgress::default()));
    solver.compute();

    let leaves = solver.triangles();
    let rad = solver.radiosity();
    info!("Solved {} leaf patches", leaves.len());

    // Shade by casting one ray per pixel into the refined leaves. The leaf
    // accelerator's ids equal positions in the solver's depth-first order.
    let camera = Camera::new(
        Point3f::new(0.0, 0.0, -2.4),
        Point3f::new(0.0, 0.0, 0.0),
        Vector3f::new(0.0, 1.0, 0.0),
        60.0,
    );
    let leaf_accel = BVHAccel::new(leaves, 4);
    let mut image = RGBImage::new(options.width, options.height, Spectrum::default());
    for (y, x) in iproduct!(0..options.height, 0..options.width) {
        let mut ray = camera.generate_ray(x, y, options.width, options.height);
        if let Some((id, _)) = leaf_accel.intersect(&mut ray) {
            let c = rad[id];
            image.set_pixel(x, y, Spectrum::from_rgb([c.r, c.g, c.b]));
        }
    }
    image.write_png(&options.output)?;
    info!("Wrote shaded image to {}", options.output);

    let overlay =
        solver.visualize_links(&camera, RGBImage::new(options.width, options.height, Spectrum::new(1.0)));
    overlay.write_png(&options.links_output)?;
    info!("Wrote link overlay to {}", options.links_output);

    Ok(())
}

/// A Cornell-box style room: white floor, ceiling and back wall, a red and a
/// green side wall, and an emissive panel just below the ceiling. All faces
/// point into the room.
fn cornell_box() -> Vec<Triangle> {
    let mut tris = Vec::new();

    let white = Spectrum::new(0.7);
    let red = Spectrum::from_rgb([0.6, 0.05, 0.05]);
    let green = Spectrum::from_rgb([0.05, 0.6, 0.05]);
    let dark = Spectrum::default();
    let light = Spectrum::new(4.0);

    let p = Point3f::new;

    // Floor (y = -1), normal up.
    quad(
        &mut tris,
        [p(-1.0, -1.0, 1.0), p(1.0, -1.0, 1.0), p(1.0, -1.0, -1.0), p(-1.0, -1.0, -1.0)],
        white,
        dark,
    );
    // Ceiling (y = 1), normal down.
    quad(
        &mut tris,
        [p(-1.0, 1.0, -1.0), p(1.0, 1.0, -1.0), p(1.0, 1.0, 1.0), p(-1.0, 1.0, 1.0)],
        white,
        dark,
    );
    // Back wall (z = 1), normal toward the camera.
    quad(
        &mut tris,
        [p(-1.0, -1.0, 1.0), p(-1.0, 1.0, 1.0), p(1.0, 1.0, 1.0), p(1.0, -1.0, 1.0)],
        white,
        dark,
    );
    // Left wall (x = -1), red, normal right.
    quad(
        &mut tris,
        [p(-1.0, -1.0, -1.0), p(-1.0, 1.0, -1.0), p(-1.0, 1.0, 1.0), p(-1.0, -1.0, 1.0)],
        red,
        dark,
    );
    // Right wall (x = 1), green, normal left.
    quad(
        &mut tris,
        [p(1.0, -1.0, -1.0), p(1.0, -1.0, 1.0), p(1.0, 1.0, 1.0), p(1.0, 1.0, -1.0)],
        green,
        dark,
    );
    // Emissive panel just below the ceiling, facing down.
    quad(
        &mut tris,
        [p(-0.3, 0.98, -0.3), p(0.3, 0.98, -0.3), p(0.3, 0.98, 0.3), p(-0.3, 0.98, 0.3)],
        dark,
        light,
    );

    tris
}

/// Appends a quad as two matte triangles. Corners are counter-clockwise as
/// seen from the side the normal should face.
fn quad(tris: &mut Vec<Triangle>, corners: [Point3f; 4], diffuse: Spectrum, emissive: Spectrum) {
    let [a, b, c, d] = corners;
    tris.push(Triangle::matte([a, b, c], diffuse, emissive));
    tris.push(Triangle::matte([a, c, d], diffuse, emissive));
}
