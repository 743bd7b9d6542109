//! Headless demo: builds a small scene, edits it the way the editor would and
//! prints the resulting document.

use crave::prelude::*;

fn build_scene() -> Result<Scene, SceneError> {
    let mut scene = Scene::new(SceneConfig::default().with_root_name("Demo Root"));

    let center = scene.create_entity("World Center");
    scene.transform_mut(center)?.set_position(Vec3::new(0.0, 1.0, 0.0));

    let cube = scene.create_child("Cube", center)?;
    {
        let mut transform = scene.transform_mut(cube)?;
        transform.set_position(Vec3::new(2.0, 0.0, 0.0));
        transform.scale_uniform(0.5);
    }
    scene.insert_component(cube, ComponentData::MeshInstance(MeshInstance::new("cube")))?;

    let lamp = scene.create_child("Lamp", center)?;
    scene.transform_mut(lamp)?.set_position(Vec3::new(0.0, 3.0, 0.0));
    scene.insert_component(lamp, ComponentData::Light(Light::new(LightKind::Point, true)))?;

    let floor = scene.create_entity("Floor");
    scene.transform_mut(floor)?.set_scale(Vec3::new(10.0, 0.1, 10.0));
    scene.insert_component(floor, ComponentData::MeshInstance(MeshInstance::new("plane")))?;

    Ok(scene)
}

fn log_tree(scene: &Scene, panel: &SceneHierarchyPanel) -> Result<(), SceneError> {
    for row in panel.rows(scene)? {
        let world = scene.world_transform(row.entity)?;
        log::info!(
            "{:indent$}{} at {:?}",
            "",
            row.label,
            world.w_axis.truncate(),
            indent = row.depth * 2
        );
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut scene = build_scene()?;
    let mut panel = SceneHierarchyPanel::new();
    log_tree(&scene, &panel)?;

    let floor = scene
        .traverse()?
        .into_iter()
        .map(|(entity, _)| entity)
        .find(|&entity| scene.tag(entity).is_ok_and(|tag| tag == "Floor"))
        .ok_or("demo scene has no floor")?;
    let center = scene.children(scene.root())?[0];

    // orbit the whole group around the floor's origin
    scene.rotate_around_point(center, Vec3::ZERO, 45.0, Vec3::Y)?;

    // a pure yaw stays representable under a floor stretched evenly in X and Z
    panel.handle(
        &mut scene,
        PanelAction::DropOnEntity {
            dragged: center,
            target: floor,
        },
    )?;

    let ramp = scene.create_entity("Ramp");
    scene.transform_mut(ramp)?.rotate_to_euler(Vec3::new(0.0, 0.0, 30.0));

    // a cycle, then a tilt that would need shear under the flattened floor
    for (dragged, target) in [(floor, center), (ramp, floor)] {
        if let Err(e) = panel.handle(&mut scene, PanelAction::DropOnEntity { dragged, target }) {
            log::warn!("drop refused: {e}");
        }
    }

    scene.begin_frame();
    for event in scene.events().iter() {
        log::debug!("{event:?}");
    }
    log_tree(&scene, &panel)?;

    for item in scene.draw_list()? {
        log::info!("draw '{}' at {:?}", item.mesh, item.matrix.w_axis.truncate());
    }

    let document = SceneDocument::capture(&scene, "demo")?;
    let ron = ron::ser::to_string_pretty(&document, ron::ser::PrettyConfig::default())?;
    println!("{ron}");
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Demo error: {}", e);
    }
}
