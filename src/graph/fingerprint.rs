use xxhash_rust::xxh3::Xxh3;

use crate::graph::memory::InMemoryScene;
use crate::graph::model::{AttrValue, Plug};
use crate::graph::scene::SceneGraph;

const XXH3_SEED: u64 = 0x5a3c_71e2_94d0_b6af;

/// Stable structural fingerprint of a scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SceneFingerprint {
    /// High 64 bits.
    pub hi: u64,
    /// Low 64 bits.
    pub lo: u64,
}

/// Hash node names, kinds, parenting, stored attribute values and connections.
///
/// Node ids are not hashed, only names, so two scenes built by the same calls in the
/// same order fingerprint equal.
pub fn fingerprint_scene(scene: &InMemoryScene) -> SceneFingerprint {
    let mut h = StableHasher::new();

    let nodes = scene.nodes();
    h.write_u32(nodes.len() as u32);
    for id in nodes {
        let Ok(rec) = scene.record(id) else { continue };
        h.write_str(&rec.name);
        h.write_str(&format!("{:?}", rec.kind));
        match rec.parent.and_then(|p| scene.node_name(p).ok()) {
            Some(p) => {
                h.write_bool(true);
                h.write_str(&p);
            }
            None => h.write_bool(false),
        }
        h.write_u32(rec.attrs.len() as u32);
        for (name, attr) in &rec.attrs {
            h.write_str(name);
            if attr.output {
                continue;
            }
            h.write_value(&attr.value);
            h.write_u32(attr.elements.len() as u32);
            for (i, v) in &attr.elements {
                h.write_u64(*i as u64);
                h.write_value(v);
            }
        }
    }

    let conns: Vec<_> = scene.connections().collect();
    h.write_u32(conns.len() as u32);
    for c in conns {
        h.write_plug(scene, &c.src);
        h.write_plug(scene, &c.dst);
    }
    h.finish()
}

struct StableHasher {
    inner: Xxh3,
}

impl StableHasher {
    fn new() -> Self {
        Self {
            inner: Xxh3::with_seed(XXH3_SEED),
        }
    }

    fn write_bytes(&mut self, b: &[u8]) {
        self.inner.update(b);
    }

    fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn write_str(&mut self, s: &str) {
        self.write_u32(s.len() as u32);
        self.write_bytes(s.as_bytes());
    }

    fn write_plug(&mut self, scene: &InMemoryScene, plug: &Plug) {
        self.write_str(&scene.describe(plug));
    }

    fn write_value(&mut self, v: &AttrValue) {
        match v {
            AttrValue::Float(f) => {
                self.write_u8(0);
                self.write_f64(*f);
            }
            AttrValue::Bool(b) => {
                self.write_u8(1);
                self.write_bool(*b);
            }
            AttrValue::Int(i) => {
                self.write_u8(2);
                self.write_u64(*i as u64);
            }
            AttrValue::Text(s) => {
                self.write_u8(3);
                self.write_str(s);
            }
            AttrValue::Vec3(v) => {
                self.write_u8(4);
                v.iter().for_each(|c| self.write_f64(*c));
            }
            AttrValue::Matrix(m) => {
                self.write_u8(5);
                m.iter().for_each(|c| self.write_f64(*c));
            }
            AttrValue::Points(pts) => {
                self.write_u8(6);
                self.write_u32(pts.len() as u32);
                for p in pts {
                    p.iter().for_each(|c| self.write_f64(*c));
                }
            }
            AttrValue::Nodes(ids) => {
                self.write_u8(7);
                self.write_u32(ids.len() as u32);
                for id in ids {
                    self.write_u32(id.0);
                }
            }
        }
    }

    fn finish(self) -> SceneFingerprint {
        let v = self.inner.digest128();
        SceneFingerprint {
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/fingerprint.rs"]
mod tests;
