//! WGSL source assembly shared by the volume kernels.
//!
//! Templates refer to the element storage through `{{SRC_TYPE}}`,
//! `{{DST_TYPE}}` and a pair of helpers injected at `{{ELEMENT_IO}}`:
//! `read_voxel(i) -> f32` and `write_voxel(i, v)`. `uint16` volumes are
//! packed two per 32-bit word; the destination is written with `atomicOr`
//! because neighbouring invocations share words.

use crate::volume::Voxel;

const F32_IO: &str = r#"fn read_voxel(i: u32) -> f32 {
    return src[i];
}

fn write_voxel(i: u32, v: f32) {
    dst[i] = v;
}"#;

const U16_IO: &str = r#"fn read_voxel(i: u32) -> f32 {
    let word = src[i >> 1u];
    return f32((word >> ((i & 1u) * 16u)) & 0xffffu);
}

fn write_voxel(i: u32, v: f32) {
    let q = u32(clamp(floor(v + 0.5), 0.0, 65535.0));
    atomicOr(&dst[i >> 1u], q << ((i & 1u) * 16u));
}"#;

/// Substitutes the element placeholders of `template` for `T`.
pub(crate) fn render<T: Voxel>(template: &str, consts: &[(&str, String)]) -> String {
    let (src_type, dst_type, io) = if T::PACKED {
        ("array<u32>", "array<atomic<u32>>", U16_IO)
    } else {
        ("array<f32>", "array<f32>", F32_IO)
    };

    let mut source = template
        .replace("{{SRC_TYPE}}", src_type)
        .replace("{{DST_TYPE}}", dst_type)
        .replace("{{ELEMENT_IO}}", io);
    for (key, value) in consts {
        source = source.replace(&format!("{{{{{key}}}}}"), value);
    }
    source
}
