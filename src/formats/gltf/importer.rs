use std::{collections::HashMap, path::Path};

use anyhow::Result;
use glam::{EulerRot, Quat, Vec2, Vec3, Vec3A};

use crate::{
    asset::Asset,
    conversion::Importer,
    scene::{
        Camera, Corner, Image, Influence, Material, Mesh, Polygon, Scene, MAX_TEXTURE_CHANNELS,
    },
};

#[derive(Default)]
pub struct GltfImporter {}

impl Importer for GltfImporter {
    fn import(&self, asset: &Asset, scene: &mut Scene) -> Result<()> {
        let gltf = gltf::Gltf::from_slice(&asset.bytes)?;
        let buffers = load_buffers(&gltf, asset.path())?;

        let joint_names = make_joint_names(&gltf);

        scene.cameras.append(&mut convert_cameras(&gltf));
        scene.materials.append(&mut convert_materials(&gltf));
        scene
            .images
            .append(&mut convert_images(&gltf, &buffers, asset.path())?);
        scene
            .meshes
            .append(&mut convert_meshes(&gltf, &buffers, &joint_names));

        Ok(())
    }

    fn extensions(&self) -> &[&str] {
        &["gltf", "glb"]
    }
}

/// Returns a mapping between skin-local joint indices and the names of their
/// nodes. The first skin is used; multi-skin files are rare in practice.
fn make_joint_names(gltf: &gltf::Gltf) -> HashMap<u16, String> {
    gltf.skins()
        .next()
        .map(|skin| {
            skin.joints()
                .enumerate()
                .map(|(index, node)| {
                    let name = node
                        .name()
                        .map(String::from)
                        .unwrap_or_else(|| format!("joint_{}", node.index()));
                    (index as u16, name)
                })
                .collect()
        })
        .unwrap_or_default()
}

fn convert_cameras(gltf: &gltf::Gltf) -> Vec<Camera> {
    gltf.nodes()
        .filter_map(|node| {
            let camera = node.camera()?;
            let perspective = match camera.projection() {
                gltf::camera::Projection::Perspective(perspective) => perspective,
                gltf::camera::Projection::Orthographic(_) => return None,
            };

            let (translation, rotation, _) = node.transform().decomposed();
            let rotation = Quat::from_array(rotation);

            Some(Camera {
                name: camera
                    .name()
                    .or_else(|| node.name())
                    .unwrap_or("Camera")
                    .into(),
                translation: translation.into(),
                // Cameras look down their local -Z axis.
                direction: rotation * Vec3A::new(0., 0., -1.),
                fov: perspective.yfov().to_degrees(),
                clip_start: perspective.znear(),
                clip_end: perspective.zfar().unwrap_or(100.),
            })
        })
        .collect()
}

fn convert_materials(gltf: &gltf::Gltf) -> Vec<Material> {
    gltf.materials()
        .filter_map(|material| {
            let index = material.index()?;
            let pbr = material.pbr_metallic_roughness();
            let [r, g, b, a] = pbr.base_color_factor();

            let diffuse_map = pbr
                .base_color_texture()
                .and_then(|info| image_name(&info.texture().source()));

            Some(Material {
                name: material
                    .name()
                    .map(String::from)
                    .unwrap_or_else(|| format!("material_{}", index)),
                diffuse_map,
                ambient_map: None,
                sound_buffer: None,
                diffuse: Vec3::new(r, g, b),
                specular: Vec3::splat(1. - pbr.roughness_factor()),
                alpha: a,
                shininess: (1. - pbr.roughness_factor()) * 128.,
            })
        })
        .collect()
}

fn convert_images(
    gltf: &gltf::Gltf,
    buffers: &[Vec<u8>],
    asset_path: &Path,
) -> Result<Vec<Image>> {
    let mut images = Vec::new();
    for image in gltf.images() {
        let name = match image_name(&image) {
            Some(name) => name,
            None => continue,
        };

        let bytes = match image.source() {
            gltf::image::Source::View { view, .. } => {
                let buffer = &buffers[view.buffer().index()];
                buffer[view.offset()..view.offset() + view.length()].to_vec()
            }
            gltf::image::Source::Uri { uri, .. } => match DataUri::parse(uri) {
                Ok(data_uri) => data_uri.decode()?,
                Err(()) => {
                    let path = asset_path.parent().unwrap_or(Path::new(".")).join(uri);
                    std::fs::read(path)?
                }
            },
        };

        images.push(Image { name, bytes });
    }

    Ok(images)
}

/// The file name an image is referenced by in material bindings. Images
/// embedded without a name or URI cannot be bound and are dropped.
fn image_name(image: &gltf::Image) -> Option<String> {
    if let gltf::image::Source::Uri { uri, .. } = image.source() {
        if !uri.starts_with("data:") {
            let name = uri.rsplit('/').next().unwrap_or(uri);
            return Some(name.into());
        }
    }

    image.name().map(|name| format!("{}.png", name))
}

fn convert_meshes(
    gltf: &gltf::Gltf,
    buffers: &[Vec<u8>],
    joint_names: &HashMap<u16, String>,
) -> Vec<Mesh> {
    let mut meshes = Vec::new();
    for node in gltf.nodes() {
        let gltf_mesh = match node.mesh() {
            Some(mesh) => mesh,
            None => continue,
        };
        let name = gltf_mesh
            .name()
            .or_else(|| node.name())
            .map(String::from)
            .unwrap_or_else(|| format!("mesh_{}", gltf_mesh.index()));

        let (translation, rotation, scale) = node.transform().decomposed();
        let (rx, ry, rz) = Quat::from_array(rotation).to_euler(EulerRot::XYZ);

        for primitive in gltf_mesh.primitives() {
            let mut mesh = Mesh {
                name: name.clone(),
                translation: translation.into(),
                rotation: Vec3A::new(rx, ry, rz),
                scale: scale.into(),
                ..Default::default()
            };

            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            mesh.positions = reader
                .read_positions()
                .map(|v| v.map(|x| x.into()).collect())
                .unwrap_or_default();
            mesh.normals = reader
                .read_normals()
                .map(|v| v.map(|x| x.into()).collect())
                .unwrap_or_default();
            mesh.colors = reader
                .read_colors(0)
                .map(|v| v.into_rgba_f32().collect())
                .unwrap_or_default();
            for channel in 0..MAX_TEXTURE_CHANNELS as u32 {
                let uvs: Vec<Vec2> = reader
                    .read_tex_coords(channel)
                    .map(|v| v.into_f32().map(|x| x.into()).collect())
                    .unwrap_or_default();
                if uvs.is_empty() {
                    break;
                }
                mesh.uv_channels.push(uvs);
            }

            let indices: Vec<usize> = reader
                .read_indices()
                .map(|v| v.into_u32().map(|x| x as usize).collect())
                .unwrap_or_else(|| (0..mesh.positions.len()).collect());

            // Vertex attributes are indexed uniformly in glTF, so a corner's
            // UV reference is its position index in every channel.
            mesh.polygons = indices
                .chunks_exact(3)
                .map(|triple| Polygon {
                    corners: triple
                        .iter()
                        .map(|&index| {
                            let mut corner = Corner::new(index);
                            for (channel, uvs) in mesh.uv_channels.iter().enumerate() {
                                if index < uvs.len() {
                                    corner.uv[channel] = Some(index);
                                }
                            }
                            corner
                        })
                        .collect(),
                })
                .collect();

            mesh.influences = convert_influences(&reader, joint_names);

            if let Some(material) = primitive.material().name() {
                mesh.materials.push(material.into());
            }

            meshes.push(mesh);
        }
    }

    meshes
}

/// Groups skinned vertices under the joint with the greatest weight, one
/// influence per referenced joint.
fn convert_influences<'a, 's, F>(
    reader: &gltf::mesh::Reader<'a, 's, F>,
    joint_names: &HashMap<u16, String>,
) -> Vec<Influence>
where
    F: Clone + Fn(gltf::Buffer<'a>) -> Option<&'s [u8]>,
{
    let joints: Vec<[u16; 4]> = reader
        .read_joints(0)
        .map(|v| v.into_u16().collect())
        .unwrap_or_default();
    let weights: Vec<[f32; 4]> = reader
        .read_weights(0)
        .map(|v| v.into_f32().collect())
        .unwrap_or_default();

    let mut groups: HashMap<u16, Vec<usize>> = HashMap::new();
    for (vertex, (joints, weights)) in joints.iter().zip(&weights).enumerate() {
        let strongest = joints
            .iter()
            .zip(weights)
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        if let Some((&joint, &weight)) = strongest {
            if weight > 0. {
                groups.entry(joint).or_default().push(vertex);
            }
        }
    }

    let mut influences: Vec<_> = groups.into_iter().collect();
    influences.sort_by_key(|(joint, _)| *joint);
    influences
        .into_iter()
        .map(|(joint, vertices)| Influence {
            name: joint_names
                .get(&joint)
                .cloned()
                .unwrap_or_else(|| format!("joint_{}", joint)),
            vertices,
            weight: 1.,
        })
        .collect()
}

// Adapted from https://github.com/bevyengine/bevy/blob/c6fec1f0c256597af9746050dd1a4dcd3b80fe24/crates/bevy_gltf/src/loader.rs#L643
fn load_buffers(gltf: &gltf::Gltf, asset_path: &Path) -> Result<Vec<Vec<u8>>> {
    const VALID_MIME_TYPES: &[&str] = &["application/octet-stream", "application/gltf-buffer"];

    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Uri(uri) => {
                let buffer_bytes = match DataUri::parse(uri) {
                    Ok(data_uri) if VALID_MIME_TYPES.contains(&data_uri.mime_type) => {
                        data_uri.decode()?
                    }
                    Ok(_) => return Err(anyhow::anyhow!("Buffer format unsupported")),
                    Err(()) => {
                        let buffer_path = asset_path.parent().unwrap_or(Path::new(".")).join(uri);
                        std::fs::read(buffer_path)?
                    }
                };
                buffer_data.push(buffer_bytes);
            }
            gltf::buffer::Source::Bin => {
                if let Some(blob) = gltf.blob.as_deref() {
                    buffer_data.push(blob.into());
                } else {
                    return Err(anyhow::anyhow!("The GLB binary chunk is missing"));
                }
            }
        }
    }

    Ok(buffer_data)
}

// Taken from https://github.com/bevyengine/bevy/blob/c6fec1f0c256597af9746050dd1a4dcd3b80fe24/crates/bevy_gltf/src/loader.rs#L742
struct DataUri<'a> {
    mime_type: &'a str,
    base64: bool,
    data: &'a str,
}

impl<'a> DataUri<'a> {
    fn parse(uri: &'a str) -> Result<DataUri<'a>, ()> {
        let uri = uri.strip_prefix("data:").ok_or(())?;
        let (mime_type, data) = split_once(uri, ',').ok_or(())?;

        let (mime_type, base64) = match mime_type.strip_suffix(";base64") {
            Some(mime_type) => (mime_type, true),
            None => (mime_type, false),
        };

        Ok(DataUri {
            mime_type,
            base64,
            data,
        })
    }

    fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        if self.base64 {
            base64::decode(self.data)
        } else {
            Ok(self.data.as_bytes().to_owned())
        }
    }
}

fn split_once(input: &str, delimiter: char) -> Option<(&str, &str)> {
    let mut iter = input.splitn(2, delimiter);
    Some((iter.next()?, iter.next()?))
}
