//! glTF/GLB import into the scene graph.
//!
//! Positions, normals, indices, node transforms and the metallic-roughness
//! factors of each material are read; textures are ignored because the
//! decorative pieces are shaded with flat PBR colours plus the environment
//! map. Every geometry and material is allocated through the same
//! [`ResourceTracker`](crate::resources::ResourceTracker) as the procedural
//! knight, so teardown treats both identically.

use std::{
    io::{BufReader, Cursor},
    rc::Rc,
};

use cgmath::InnerSpace;

use crate::{
    data_structures::{
        geometry::{Geometry, ModelVertex},
        material::{MaterialFactory, StandardMaterial},
        scene_graph::{Mesh, Node},
        transform::Transform,
    },
    resources::AssetLoader,
};

pub async fn load_gltf_model<L: AssetLoader>(
    loader: &L,
    file_name: &str,
    factory: &MaterialFactory,
) -> anyhow::Result<Node> {
    let gltf_bytes = loader.load_binary(file_name).await?;
    let gltf_reader = BufReader::new(Cursor::new(gltf_bytes));
    let gltf = gltf::Gltf::from_reader(gltf_reader)?;

    // Load buffers
    let mut buffer_data: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                let blob = gltf
                    .blob
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("{} references a missing GLB blob", file_name))?;
                buffer_data.push(blob.into());
            }
            gltf::buffer::Source::Uri(uri) => {
                anyhow::ensure!(
                    !uri.starts_with("data:"),
                    "embedded data URIs are not supported ({})",
                    file_name
                );
                buffer_data.push(loader.load_binary(uri).await?);
            }
        }
    }

    // Nothing is allocated before this point, so a failure above leaks nothing.
    let mut materials = MaterialCache {
        factors: gltf
            .materials()
            .map(|material| {
                let pbr = material.pbr_metallic_roughness();
                let [r, g, b, _] = pbr.base_color_factor();
                ([r, g, b], pbr.metallic_factor(), pbr.roughness_factor())
            })
            .collect(),
        created: Vec::new(),
        factory,
    };
    materials.created.resize(materials.factors.len(), None);

    let mut root = Node::group(file_name);
    for scene in gltf.scenes() {
        for node in scene.nodes() {
            root.add_child(to_scene_node(node, &buffer_data, &mut materials));
        }
    }
    log::info!("imported {}", file_name);
    Ok(root)
}

/// Materials are created on first use so that every allocation ends up
/// referenced by a mesh and is reached by teardown.
struct MaterialCache<'a> {
    factors: Vec<([f32; 3], f32, f32)>,
    created: Vec<Option<Rc<StandardMaterial>>>,
    factory: &'a MaterialFactory,
}

impl MaterialCache<'_> {
    fn get(&mut self, index: Option<usize>) -> Rc<StandardMaterial> {
        let Some(index) = index.filter(|&i| i < self.factors.len()) else {
            return self.factory.create();
        };
        if let Some(material) = &self.created[index] {
            return material.clone();
        }
        let (color, metalness, roughness) = self.factors[index];
        let material = StandardMaterial::new(
            color,
            metalness,
            roughness,
            self.factory.env_map.clone(),
            self.factory.reflectivity,
            self.factory.tracker(),
        );
        self.created[index] = Some(material.clone());
        material
    }
}

fn to_scene_node(
    node: gltf::scene::Node,
    buffers: &[Vec<u8>],
    materials: &mut MaterialCache<'_>,
) -> Node {
    let name = node.name().unwrap_or("node").to_string();
    let (translation, rotation, scale) = node.transform().decomposed();
    let local = Transform {
        position: translation.into(),
        rotation: cgmath::Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
        scale: scale.into(),
    };
    let mut scene_node = Node::group(&name).with_transform(local);

    if let Some(mesh) = node.mesh() {
        for (idx, primitive) in mesh.primitives().enumerate() {
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

            let mut vertices: Vec<ModelVertex> = match reader.read_positions() {
                Some(positions) => positions
                    .map(|position| ModelVertex {
                        position,
                        normal: [0.0; 3],
                    })
                    .collect(),
                None => {
                    log::warn!("primitive {} of {} has no positions, skipping", idx, name);
                    continue;
                }
            };
            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..vertices.len() as u32).collect(),
            };
            if indices.iter().any(|&i| (i as usize) >= vertices.len()) {
                log::warn!("primitive {} of {} indexes past its vertices, skipping", idx, name);
                continue;
            }
            match reader.read_normals() {
                Some(normals) => vertices
                    .iter_mut()
                    .zip(normals)
                    .for_each(|(vertex, normal)| vertex.normal = normal),
                None => compute_normals(&mut vertices, &indices),
            }

            let material = materials.get(primitive.material().index());
            let geometry = Geometry::new(
                &format!("{} #{}", name, idx),
                vertices,
                indices,
                materials.factory.tracker(),
            );
            scene_node.add_child(Node::mesh(
                &format!("{} primitive {}", name, idx),
                Mesh::new(geometry, material).with_shadows(),
            ));
        }
    }

    for child in node.children() {
        scene_node.add_child(to_scene_node(child, buffers, materials));
    }
    scene_node
}

/// Area-weighted vertex normals for meshes exported without them.
fn compute_normals(vertices: &mut [ModelVertex], indices: &[u32]) {
    let mut sums = vec![cgmath::Vector3::new(0.0f32, 0.0, 0.0); vertices.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let pa: cgmath::Vector3<f32> = vertices[a].position.into();
        let pb: cgmath::Vector3<f32> = vertices[b].position.into();
        let pc: cgmath::Vector3<f32> = vertices[c].position.into();
        let face = (pb - pa).cross(pc - pa);
        sums[a] += face;
        sums[b] += face;
        sums[c] += face;
    }
    for (vertex, sum) in vertices.iter_mut().zip(sums) {
        vertex.normal = if sum.magnitude2() > 0.0 {
            sum.normalize().into()
        } else {
            [0.0, 1.0, 0.0]
        };
    }
}
