use anyhow::Result;
use glam::Vec3;

use crate::{
    asset::Asset,
    conversion::Exporter,
    scene::{Camera, Image, Lamp, Material, Mesh, Scene},
};

use super::{
    geometry::{self, Triangulation},
    is_sound_buffer,
    record::{fmt_float, Record},
    sanitize_name, space, ExportOptions,
};

/// The fixed animation name every exported frame carries.
const ANIMATION_NAME: &str = "DefAnimName";

/// Exports a scene into the SIO2 text record layout, one asset per entity.
#[derive(Default)]
pub struct Sio2Exporter {
    pub options: ExportOptions,
}

impl Sio2Exporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }
}

impl Exporter for Sio2Exporter {
    fn export(&self, scene: &Scene) -> Result<Vec<Asset>> {
        let mut pass = ExportPass::new(&self.options);

        // Meshes go first: in blend-shape mode the mesh pass decides which
        // materials the material pass must skip.
        for mesh in &scene.meshes {
            pass.export_mesh(mesh);
        }
        for material in &scene.materials {
            pass.export_material(material);
        }
        for camera in &scene.cameras {
            pass.export_camera(camera);
        }
        for lamp in &scene.lamps {
            pass.export_lamp(lamp);
        }
        for image in &scene.images {
            pass.export_image(image);
        }

        Ok(pass.assets)
    }
}

/// The state of one full-scene export pass. The skipped-material list is
/// written by the mesh stage and read by the material stage; it dies with
/// the pass.
struct ExportPass<'a> {
    options: &'a ExportOptions,
    skipped_materials: Vec<String>,
    assets: Vec<Asset>,
}

impl<'a> ExportPass<'a> {
    fn new(options: &'a ExportOptions) -> Self {
        Self {
            options,
            skipped_materials: Vec::new(),
            assets: Vec::new(),
        }
    }

    /// Serializes a mesh into an object record. In blend-shape mode, a mesh
    /// without keyframe animation is a shape target and is excluded from
    /// export entirely; only its material names are remembered.
    fn export_mesh(&mut self, mesh: &Mesh) {
        if self.options.blend_shapes && !mesh.has_keyframes() {
            log::info!(
                "Excluding shape target \"{}\" from the export",
                mesh.name
            );
            for material in &mesh.materials {
                self.skipped_materials.push(sanitize_name(material));
            }
            return;
        }

        let name = sanitize_name(&mesh.name);
        let mut record = Record::new("object", format!("object/{}", name));

        let rotation = space::to_target_point(mesh.rotation);
        record.floats("loc", &space::to_target_point(mesh.translation).to_array());
        record.floats(
            "rot",
            &[
                space::to_degrees(rotation.x),
                space::to_degrees(rotation.y),
                space::to_degrees(rotation.z),
            ],
        );
        record.floats("scl", &mesh.scale.to_array());

        // Engine defaults; the source package carries no bounding data.
        record.floats("rad", &[1.732]);
        record.floats("bounds", &[4.]);
        record.floats("dim", &[1., 1., 1.]);

        let (vbo_size, offsets) = vbo_offsets(mesh);
        record.field(
            "vbo_offset",
            format!(
                "{} {} {} {} {}",
                vbo_size, offsets[0], offsets[1], offsets[2], offsets[3]
            ),
        );

        for &position in &mesh.positions {
            record.floats("vert", &space::to_target_point(position).to_array());
        }
        for color in &mesh.colors {
            record.floats("vcol", color);
        }
        for &normal in &mesh.normals {
            record.floats("vnor", &space::to_target_point(normal).to_array());
        }

        let triangulation =
            geometry::triangulate(mesh, self.options.convert_to_backface_culling);
        if triangulation.rejected > 0 {
            log::warn!(
                "Mesh \"{}\": dropped {} of {} triangles with unresolved vertices",
                mesh.name,
                triangulation.rejected,
                triangulation.attempted
            );
        }

        for (channel, uvs) in geometry::uv_channels(mesh, &triangulation)
            .iter()
            .enumerate()
        {
            for uv in uvs {
                record.floats(format!("uv{}", channel), &uv.to_array());
            }
        }

        self.write_vertex_groups(&mut record, mesh, &triangulation);
        self.write_frames(&mut record, mesh);

        self.assets.push(Asset::new(
            record.serialize().into_bytes(),
            &format!("object/{}", name),
        ));
    }

    fn write_vertex_groups(&self, record: &mut Record, mesh: &Mesh, triangulation: &Triangulation) {
        let groups = geometry::vertex_groups(
            mesh,
            triangulation,
            self.options.membership,
            self.options.blend_shapes,
        );

        record.int("n_vgroup", groups.len());
        for group in &groups {
            record.text("vgroup", &group.name);
            for material in &mesh.materials {
                record.text("mname", &format!("material/{}", sanitize_name(material)));
            }

            if !group.triangles.is_empty() {
                record.int("n_ind", group.triangles.len() * 3);
                for [a, b, c] in &group.triangles {
                    record.field("ind", format!("{} {} {}", a, b, c));
                }
            }
        }
    }

    fn write_frames(&self, record: &mut Record, mesh: &Mesh) {
        // Without keyframes and without a frame rate the mesh is static and
        // carries no animation block at all.
        let fallback = self.options.frame_rate > 0 && !self.options.blend_shapes;
        if !mesh.has_keyframes() && !fallback {
            return;
        }

        let frames = geometry::sample_frames(mesh, self.options);
        record.int("n_frame", frames.len());
        for frame in &frames {
            record.field(
                "frame",
                format!("{} \"{}\"", fmt_float(frame.time as f32), ANIMATION_NAME),
            );
            for &point in &frame.points {
                record.floats("fvert", &space::to_target_point(point).to_array());
            }
        }
    }

    /// Serializes a material record, unless the blend-shape mesh pass put
    /// the material on the skip list.
    fn export_material(&mut self, material: &Material) {
        let name = sanitize_name(&material.name);
        if self.options.blend_shapes && self.skipped_materials.contains(&name) {
            log::info!("Skipping material \"{}\" of an excluded shape target", name);
            return;
        }

        let mut record = Record::new("material", format!("material/{}", name));

        // The engine matches these tokens literally, including the
        // historical "tfalgs"/"sfalgs" spelling; only the channel 0 name is
        // quoted.
        if let Some(map) = &material.diffuse_map {
            record.int("tfalgs0", 1);
            record.text("tname0", &format!("image/{}", map));
        }
        if let Some(map) = &material.ambient_map {
            record.int("tfalgs1", 1);
            record.field("tname1", format!("image/{}", map));
        }
        if let Some(sound) = &material.sound_buffer {
            if is_sound_buffer(sound) {
                record.int("sfalgs", 1);
                record.field("sbname", format!("image/{}", sound));
            }
        }

        let mut diffuse = material.diffuse;
        if diffuse.x <= 0. && diffuse.y <= 0. && diffuse.z <= 0. {
            log::warn!(
                "Material \"{}\": diffuse color is <= 0, the object will not reflect light; using 0.8",
                name
            );
            diffuse = Vec3::splat(0.8);
        }
        record.floats("diffuse", &diffuse.to_array());
        record.floats("specular", &material.specular.to_array());
        record.floats("alpha", &[material.alpha]);
        record.floats("shininess", &[material.shininess]);

        self.assets.push(Asset::new(
            record.serialize().into_bytes(),
            &format!("material/{}", name),
        ));
    }

    fn export_camera(&mut self, camera: &Camera) {
        let name = sanitize_name(&camera.name);
        let mut record = Record::new("camera", format!("camera/{}", name));

        let direction = space::to_target_direction(camera.direction.normalize_or_zero());
        record.floats("loc", &space::to_target_point(camera.translation).to_array());
        record.floats("dir", &direction.to_array());
        record.floats("fov", &[camera.fov]);
        record.floats("cstart", &[camera.clip_start]);
        record.floats("cend", &[camera.clip_end]);

        self.assets.push(Asset::new(
            record.serialize().into_bytes(),
            &format!("camera/{}", name),
        ));
    }

    fn export_lamp(&mut self, lamp: &Lamp) {
        let name = sanitize_name(&lamp.name);
        let mut record = Record::new("lamp", format!("lamp/{}", name));

        record.int("type", lamp.kind.code() as usize);
        record.floats("loc", &space::to_target_point(lamp.translation).to_array());
        record.floats(
            "dir",
            &space::to_target_direction(lamp.direction).to_array(),
        );
        record.floats("col", &lamp.color.to_array());
        record.floats("nrg", &[lamp.energy]);
        record.floats("dst", &[lamp.distance]);
        record.floats("fov", &[space::to_degrees(lamp.spot_fov)]);
        record.floats("sblend", &[lamp.spot_blend]);
        record.floats("att1", &[lamp.attenuation[0]]);
        record.floats("att2", &[lamp.attenuation[1]]);

        self.assets.push(Asset::new(
            record.serialize().into_bytes(),
            &format!("lamp/{}", name),
        ));
    }

    /// Copies a texture or sound file into its category directory.
    fn export_image(&mut self, image: &Image) {
        let dir = if image.is_sound_buffer() {
            "sound"
        } else {
            "image"
        };
        self.assets.push(Asset::new(
            image.bytes.clone(),
            &format!("{}/{}", dir, image.name),
        ));
    }
}

/// Computes the `vbo_offset` field: the total interleaved buffer size and
/// the offsets of the color, normal, and first two UV streams. Offsets stay
/// zero for absent channels.
fn vbo_offsets(mesh: &Mesh) -> (usize, [usize; 4]) {
    let num_vertices = mesh.positions.len();
    let mut size = num_vertices * 12;
    let mut offsets = [0; 4];

    if !mesh.colors.is_empty() {
        offsets[0] = size;
        size += num_vertices * 4;
    }
    if !mesh.normals.is_empty() {
        offsets[1] = size;
        size += num_vertices * 12;
    }
    if !mesh.uv_channels.is_empty() && !mesh.uv_channels[0].is_empty() {
        offsets[2] = size;
        size += num_vertices * 8;

        if mesh.uv_channels.len() > 1 {
            offsets[3] = size;
            size += num_vertices * 8;
        }
    }

    (size, offsets)
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec3A};
    use pretty_assertions::assert_eq;

    use crate::scene::{Corner, LampKind, Polygon, VertexAnimation};

    use super::*;

    fn quad_mesh(name: &str) -> Mesh {
        let mut mesh = Mesh::default();
        mesh.name = name.into();
        mesh.scale = Vec3A::ONE;
        mesh.positions = vec![
            Vec3A::new(0., 0., 0.),
            Vec3A::new(1., 0., 0.),
            Vec3A::new(1., 1., 0.),
            Vec3A::new(0., 1., 0.),
        ];
        mesh.uv_channels = vec![vec![
            Vec2::new(0., 0.),
            Vec2::new(1., 0.),
            Vec2::new(1., 1.),
            Vec2::new(0., 1.),
        ]];
        mesh.polygons = vec![Polygon {
            corners: (0..4)
                .map(|i| {
                    let mut corner = Corner::new(i);
                    corner.uv[0] = Some(i);
                    corner
                })
                .collect(),
        }];
        mesh.materials = vec![String::from("wood")];

        mesh
    }

    fn export(scene: &Scene, options: ExportOptions) -> Vec<Asset> {
        Sio2Exporter::new(options).export(scene).unwrap()
    }

    #[test]
    fn object_record() {
        let mut mesh = quad_mesh("Box:Lid");
        mesh.translation = Vec3A::new(1., 2., 3.);

        let mut scene = Scene::default();
        scene.meshes.push(mesh);

        let assets = export(&scene, ExportOptions::default());
        let record = String::from_utf8(assets[0].bytes.clone()).unwrap();

        assert_eq!("object/Box_Lid", assets[0].path().to_str().unwrap());
        assert_eq!(
            "object( \"object/Box_Lid\" )\n\
             {\n\
             \tloc( 1 -3 2 )\n\
             \trot( 0 0 0 )\n\
             \tscl( 1 1 1 )\n\
             \trad( 1.732 )\n\
             \tbounds( 4 )\n\
             \tdim( 1 1 1 )\n\
             \tvbo_offset( 80 0 0 48 0 )\n\
             \tvert( 0 0 0 )\n\
             \tvert( 1 0 0 )\n\
             \tvert( 1 0 1 )\n\
             \tvert( 0 0 1 )\n\
             \tuv0( 0 1 )\n\
             \tuv0( 1 1 )\n\
             \tuv0( 1 0 )\n\
             \tuv0( 0 0 )\n\
             \tn_vgroup( 1 )\n\
             \tvgroup( \"null\" )\n\
             \tmname( \"material/wood\" )\n\
             \tn_ind( 6 )\n\
             \tind( 0 1 2 )\n\
             \tind( 0 2 3 )\n\
             }",
            record
        );
    }

    #[test]
    fn object_record_with_animation() {
        let mut mesh = quad_mesh("Flag");
        let rest = mesh.positions.clone();
        let bent = vec![
            Vec3A::new(0., 0., 0.),
            Vec3A::new(1., 0., 0.),
            Vec3A::new(1., 1., 0.5),
            Vec3A::new(0., 1., 0.5),
        ];
        mesh.animation = Some(VertexAnimation {
            key_times: vec![0., 12.],
            samples: vec![(0., rest), (12., bent)],
        });

        let mut scene = Scene::default();
        scene.meshes.push(mesh);

        let assets = export(&scene, ExportOptions::default());
        let record = String::from_utf8(assets[0].bytes.clone()).unwrap();

        assert!(record.contains("\tn_frame( 2 )\n"));
        assert!(record.contains("\tframe( 0 \"DefAnimName\" )\n"));
        assert!(record.contains("\tframe( 12 \"DefAnimName\" )\n"));
        assert!(record.contains("\tfvert( 1 -0.5 1 )\n"));
    }

    #[test]
    fn static_mesh_has_no_animation_block() {
        let mut scene = Scene::default();
        scene.meshes.push(quad_mesh("Rock"));

        let assets = export(&scene, ExportOptions::default());
        let record = String::from_utf8(assets[0].bytes.clone()).unwrap();

        assert!(!record.contains("n_frame"));
    }

    #[test]
    fn blend_shape_targets_are_excluded() {
        let mut base = quad_mesh("Face");
        base.materials = vec![String::from("skin")];
        base.animation = Some(VertexAnimation {
            key_times: vec![0.],
            samples: vec![(0., base.positions.clone())],
        });
        let mut target = quad_mesh("Face:smile");
        target.materials = vec![String::from("smile_mat")];

        let mut scene = Scene::default();
        scene.meshes.push(base);
        scene.meshes.push(target);
        scene.materials.push(Material {
            name: String::from("skin"),
            alpha: 1.,
            ..Default::default()
        });
        scene.materials.push(Material {
            name: String::from("smile_mat"),
            alpha: 1.,
            ..Default::default()
        });

        let options = ExportOptions {
            blend_shapes: true,
            ..Default::default()
        };
        let assets = export(&scene, options);
        let paths: Vec<_> = assets
            .iter()
            .map(|asset| asset.path().to_str().unwrap().to_string())
            .collect();

        assert!(paths.contains(&String::from("object/Face")));
        assert!(!paths.iter().any(|path| path.starts_with("object/Face_")));
        assert!(paths.contains(&String::from("material/skin")));
        assert!(!paths.contains(&String::from("material/smile_mat")));
    }

    #[test]
    fn blend_shape_group_name_in_excluded_mode() {
        let mut mesh = quad_mesh("Face");
        mesh.animation = Some(VertexAnimation {
            key_times: vec![0.],
            samples: vec![(0., mesh.positions.clone())],
        });

        let mut scene = Scene::default();
        scene.meshes.push(mesh);

        let options = ExportOptions {
            blend_shapes: true,
            ..Default::default()
        };
        let assets = export(&scene, options);
        let record = String::from_utf8(assets[0].bytes.clone()).unwrap();

        assert!(record.contains("\tvgroup( \"blendShape\" )\n"));
    }

    #[test]
    fn camera_record() {
        let mut scene = Scene::default();
        scene.cameras.push(Camera {
            name: String::from("Main"),
            translation: Vec3A::new(0., 5., 10.),
            direction: Vec3A::new(0., 0., -2.),
            fov: 39.6,
            clip_start: 0.1,
            clip_end: 100.,
        });

        let assets = export(&scene, ExportOptions::default());
        let record = String::from_utf8(assets[0].bytes.clone()).unwrap();

        assert_eq!(
            "camera( \"camera/Main\" )\n\
             {\n\
             \tloc( 0 -10 5 )\n\
             \tdir( 0 -1 0 )\n\
             \tfov( 39.6 )\n\
             \tcstart( 0.1 )\n\
             \tcend( 100 )\n\
             }",
            record
        );
    }

    #[test]
    fn lamp_record() {
        let mut scene = Scene::default();
        scene.lamps.push(Lamp {
            name: String::from("Key"),
            kind: LampKind::Spot,
            translation: Vec3A::new(2., 4., 2.),
            direction: Vec3A::new(0., -1., 0.),
            color: Vec3::new(1., 0.5, 0.25),
            energy: 1.5,
            distance: 25.,
            spot_fov: std::f32::consts::FRAC_PI_2,
            spot_blend: 5.,
            attenuation: [1., 0.],
        });

        let assets = export(&scene, ExportOptions::default());
        let record = String::from_utf8(assets[0].bytes.clone()).unwrap();

        assert_eq!(
            "lamp( \"lamp/Key\" )\n\
             {\n\
             \ttype( 2 )\n\
             \tloc( 2 -2 4 )\n\
             \tdir( 0 0 1 )\n\
             \tcol( 1 0.5 0.25 )\n\
             \tnrg( 1.5 )\n\
             \tdst( 25 )\n\
             \tfov( 90 )\n\
             \tsblend( 5 )\n\
             \tatt1( 1 )\n\
             \tatt2( 0 )\n\
             }",
            record
        );
    }

    #[test]
    fn material_record_with_bindings() {
        let mut scene = Scene::default();
        scene.materials.push(Material {
            name: String::from("crate"),
            diffuse_map: Some(String::from("crate.png")),
            ambient_map: Some(String::from("crate_ao.png")),
            sound_buffer: Some(String::from("creak.ogg")),
            diffuse: Vec3::new(0.8, 0.7, 0.6),
            specular: Vec3::new(0.2, 0.2, 0.2),
            alpha: 1.,
            shininess: 12.8,
        });

        let assets = export(&scene, ExportOptions::default());
        let record = String::from_utf8(assets[0].bytes.clone()).unwrap();

        // Channel tokens keep the engine's historical spelling, and only the
        // channel 0 texture name is quoted.
        assert_eq!(
            "material( \"material/crate\" )\n\
             {\n\
             \ttfalgs0( 1 )\n\
             \ttname0( \"image/crate.png\" )\n\
             \ttfalgs1( 1 )\n\
             \ttname1( image/crate_ao.png )\n\
             \tsfalgs( 1 )\n\
             \tsbname( image/creak.ogg )\n\
             \tdiffuse( 0.8 0.7 0.6 )\n\
             \tspecular( 0.2 0.2 0.2 )\n\
             \talpha( 1 )\n\
             \tshininess( 12.8 )\n\
             }",
            record
        );
    }

    #[test]
    fn dark_diffuse_falls_back() {
        let mut scene = Scene::default();
        scene.materials.push(Material {
            name: String::from("void"),
            alpha: 1.,
            ..Default::default()
        });

        let assets = export(&scene, ExportOptions::default());
        let record = String::from_utf8(assets[0].bytes.clone()).unwrap();

        assert!(record.contains("\tdiffuse( 0.8 0.8 0.8 )\n"));
    }

    #[test]
    fn images_route_to_category_dirs() {
        let mut scene = Scene::default();
        scene.images.push(Image {
            name: String::from("skin.png"),
            bytes: vec![1, 2, 3],
        });
        scene.images.push(Image {
            name: String::from("loop.ogg"),
            bytes: vec![4, 5],
        });

        let assets = export(&scene, ExportOptions::default());

        assert_eq!("image/skin.png", assets[0].path().to_str().unwrap());
        assert_eq!("sound/loop.ogg", assets[1].path().to_str().unwrap());
    }

    #[test]
    fn vbo_offsets_advance_per_channel() {
        let mut mesh = quad_mesh("Box");
        assert_eq!((80, [0, 0, 48, 0]), vbo_offsets(&mesh));

        mesh.colors = vec![[1., 1., 1., 1.]; 4];
        mesh.normals = vec![Vec3A::Z; 4];
        mesh.uv_channels.push(mesh.uv_channels[0].clone());
        // 48 positions + 16 colors + 48 normals + 32 per UV channel.
        assert_eq!((176, [48, 64, 112, 144]), vbo_offsets(&mesh));
    }
}
