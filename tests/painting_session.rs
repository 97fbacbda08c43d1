#![allow(clippy::unwrap_used)]

use std::thread;

use approx::assert_relative_eq;
use meshpaint::math::{Point3, Vector3};
use meshpaint::operations::{same_color, MakeBox};
use meshpaint::{MeshError, MeshModel, Ray, Triangle};

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .add_directive("meshpaint=info".parse().unwrap_or_default());
    // Several tests share the process; only the first install wins.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_test_writer()
        .try_init();
}

fn scene() -> Vec<Triangle> {
    let mut triangles = MakeBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(3.0, 3.0, 3.0))
        .execute()
        .unwrap();
    triangles.extend(
        MakeBox::new(Point3::new(6.0, 0.0, 0.0), Point3::new(9.0, 3.0, 0.25))
            .execute()
            .unwrap(),
    );
    triangles
}

fn pick_down(model: &MeshModel, x: f64, y: f64) -> Option<usize> {
    let ray = Ray::new(Point3::new(x, y, 10.0), Vector3::new(0.0, 0.0, -1.0));
    model.intersect_mesh(&ray)
}

#[test]
fn paint_segment_and_persist() {
    init_tracing();

    let mut model = MeshModel::new(scene()).unwrap();
    assert_eq!(model.store().triangle_count(), 24);
    assert_eq!(model.bounding_box_max(), Point3::new(9.0, 3.0, 3.0));
    assert!(model.polyhedron_valid());

    // Pick the top of the cube and paint the whole face pair.
    let top = pick_down(&model, 1.0, 2.0).unwrap();
    assert!(top < 12);
    model.set_triangle_color(top, 2).unwrap();
    let face = model
        .bucket([top], |store, candidate, from| {
            let normals = (
                store.triangle(candidate).map(|t| *t.normal()),
                store.triangle(from).map(|t| *t.normal()),
            );
            matches!(normals, (Ok(a), Ok(b)) if a.dot(&b) > 0.99)
        })
        .unwrap();
    assert_eq!(face.len(), 2);
    for &id in &face {
        model.set_triangle_color(id, 2).unwrap();
    }

    // Flood fill by color stays on the painted face.
    let painted = model
        .bucket([top], |store, candidate, from| {
            same_color(store)(candidate, from)
        })
        .unwrap();
    assert_eq!(painted.len(), 2);

    let history = model.save_state();

    model.compute_sdf().unwrap();
    let segmentation = model.segmentation(2, 0.4).unwrap();
    let plate = pick_down(&model, 7.0, 2.0).unwrap();
    assert!(plate >= 12);
    assert_ne!(segmentation.segment_of(top), segmentation.segment_of(plate));
    let covered: usize = segmentation.segments().values().map(Vec::len).sum();
    assert_eq!(covered, 24);

    // Undo to the saved state; derived data is invalidated.
    model.set_triangle_color(0, 3).unwrap();
    model.load_state(&history).unwrap();
    assert!(!model.is_sdf_computed());
    assert_eq!(model.store().triangle_color(0).unwrap(), 0);
    assert_eq!(model.store().triangle_color(top).unwrap(), 2);
    assert!(matches!(
        model.segmentation(2, 0.4),
        Err(MeshError::Segmentation(_))
    ));

    let mut bytes = Vec::new();
    model.write_project(&mut bytes).unwrap();

    let mut reopened = MeshModel::empty();
    reopened.read_project(&mut bytes.as_slice()).unwrap();
    assert_eq!(reopened.store().triangles(), model.store().triangles());
    assert_eq!(reopened.store().color_buffer(), model.store().color_buffer());
    assert_relative_eq!(reopened.progress().import_compute.get(), 1.0);
}

#[test]
fn model_moves_to_a_worker() {
    init_tracing();

    let mut model = MeshModel::new(scene()).unwrap();
    let progress = model.progress();
    let worker = thread::spawn(move || {
        model.compute_sdf().unwrap();
        model
    });
    let model = worker.join().unwrap();

    assert_relative_eq!(progress.sdf.get(), 1.0);
    assert!(model.is_sdf_computed());
    for id in 0..24 {
        let value = model.sdf_value(id).unwrap();
        assert!((0.0..=1.0).contains(&value));
    }
}
