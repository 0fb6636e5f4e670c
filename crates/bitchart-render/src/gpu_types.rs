//! GPU-compatible data structures and vertex layouts.

use bitchart_core::{Bar, Theme, Viewport};

use crate::{VERTICES_PER_CANDLE, VERTICES_PER_VOLUME_BAR};

/// Vertex-type tags in the static candle geometry.
pub const CANDLE_VERTEX_BODY: u32 = 0;
pub const CANDLE_VERTEX_UPPER_WICK: u32 = 1;
pub const CANDLE_VERTEX_LOWER_WICK: u32 = 2;

/// One vertex of the static unit geometry: a quad corner plus a tag naming
/// which part of the candle it belongs to.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CandleVertex {
    pub corner: [f32; 2],
    pub kind: u32,
}

impl CandleVertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<CandleVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x2,
                offset: 0,
                shader_location: 0,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Uint32,
                offset: 8,
                shader_location: 1,
            },
        ],
    };
}

/// Per-instance layout: the raw 24-byte bar record. `time` at offset 0, the
/// OHLC vec4 at offset 4, `volume` at offset 20, advancing once per
/// instance.
pub const BAR_INSTANCE_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<Bar>() as u64,
    step_mode: wgpu::VertexStepMode::Instance,
    attributes: &[
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32,
            offset: 0,
            shader_location: 2,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x4,
            offset: 4,
            shader_location: 3,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32,
            offset: 20,
            shader_location: 4,
        },
    ],
};

/// The 18-vertex unit candle: body quad, upper wick quad, lower wick quad.
/// Corners are in {-1, 1}; the shader maps them onto the instance's price
/// extents per quad kind.
pub fn candle_geometry() -> [CandleVertex; VERTICES_PER_CANDLE as usize] {
    fn quad(kind: u32) -> [CandleVertex; 6] {
        let c = |x: f32, y: f32| CandleVertex { corner: [x, y], kind };
        [
            c(-1.0, -1.0),
            c(1.0, -1.0),
            c(1.0, 1.0),
            c(-1.0, -1.0),
            c(1.0, 1.0),
            c(-1.0, 1.0),
        ]
    }
    let mut out = [CandleVertex {
        corner: [0.0, 0.0],
        kind: 0,
    }; VERTICES_PER_CANDLE as usize];
    out[0..6].copy_from_slice(&quad(CANDLE_VERTEX_BODY));
    out[6..12].copy_from_slice(&quad(CANDLE_VERTEX_UPPER_WICK));
    out[12..18].copy_from_slice(&quad(CANDLE_VERTEX_LOWER_WICK));
    out
}

/// The 6-vertex unit volume bar. Corner y runs 0..1: the shader scales it by
/// the instance's bar height above the strip base line.
pub fn volume_geometry() -> [CandleVertex; VERTICES_PER_VOLUME_BAR as usize] {
    let c = |x: f32, y: f32| CandleVertex {
        corner: [x, y],
        kind: 0,
    };
    [
        c(-1.0, 0.0),
        c(1.0, 0.0),
        c(1.0, 1.0),
        c(-1.0, 0.0),
        c(1.0, 1.0),
        c(-1.0, 1.0),
    ]
}

/// Candlestick uniforms. Field order matches the WGSL struct (std140: the
/// vec4s first, then the vec2, then scalars).
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CandleUniforms {
    pub up_color: [f32; 4],
    pub down_color: [f32; 4],
    pub resolution: [f32; 2],
    pub time_from: f32,
    pub time_to: f32,
    pub price_min: f32,
    pub price_max: f32,
    /// Per-candle width in NDC.
    pub candle_width: f32,
    /// Minimum body height in NDC so doji bars stay visible.
    pub min_body_height: f32,
}

/// Volume-strip uniforms.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VolumeUniforms {
    pub up_color: [f32; 4],
    pub down_color: [f32; 4],
    pub time_from: f32,
    pub time_to: f32,
    pub volume_min: f32,
    pub volume_max: f32,
    /// Bottom edge of the volume strip in NDC.
    pub base_y: f32,
    /// Height of the volume strip in NDC.
    pub height: f32,
    pub bar_width: f32,
    pub opacity: f32,
}

/// One grid rule in NDC, read by the grid shader via instance index.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GridLineGpu {
    /// NDC position along the axis the rule crosses.
    pub position: f32,
    /// 0 = vertical rule (position is x), 1 = horizontal (position is y).
    pub axis: u32,
    pub _pad: [f32; 2],
}

/// Grid uniforms.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GridUniforms {
    pub color: [f32; 4],
    pub resolution: [f32; 2],
    pub thickness_px: f32,
    pub line_count: u32,
}

/// Polyline uniforms for indicator overlays.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineUniforms {
    pub color: [f32; 4],
    pub resolution: [f32; 2],
    pub time_from: f32,
    pub time_to: f32,
    pub price_min: f32,
    pub price_max: f32,
    pub thickness_px: f32,
    pub _pad: f32,
}

/// One vertex of an expanded polyline strip. `pos` and `other` are in data
/// space (time, price); the shader projects both and offsets along the
/// screen-space normal by `side` half-thicknesses.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    pub pos: [f32; 2],
    pub other: [f32; 2],
    pub side: f32,
    pub _pad: f32,
}

impl LineVertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<LineVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x2,
                offset: 0,
                shader_location: 0,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x2,
                offset: 8,
                shader_location: 1,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32,
                offset: 16,
                shader_location: 2,
            },
        ],
    };
}

/// Expand a data-space polyline into a triangle strip (two vertices per
/// point, sides alternating -1/+1).
pub fn expand_polyline(points: &[[f32; 2]]) -> Vec<LineVertex> {
    if points.len() < 2 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(points.len() * 2);
    for (i, &p) in points.iter().enumerate() {
        // Each vertex pairs with a neighbor so the shader can derive the
        // segment direction in screen space.
        let other = if i + 1 < points.len() {
            points[i + 1]
        } else {
            points[i - 1]
        };
        out.push(LineVertex {
            pos: p,
            other,
            side: -1.0,
            _pad: 0.0,
        });
        out.push(LineVertex {
            pos: p,
            other,
            side: 1.0,
            _pad: 0.0,
        });
    }
    out
}

impl CandleUniforms {
    pub fn from_viewport(viewport: &Viewport, theme: &Theme, resolution: [f32; 2], bar_count: u32) -> Self {
        Self {
            up_color: theme.up,
            down_color: theme.down,
            resolution,
            time_from: viewport.time.from as f32,
            time_to: viewport.time.to as f32,
            price_min: viewport.price.min,
            price_max: viewport.price.max,
            candle_width: per_candle_width_ndc(bar_count),
            min_body_height: 0.001,
        }
    }
}

impl VolumeUniforms {
    pub fn from_viewport(viewport: &Viewport, theme: &Theme, bar_count: u32) -> Self {
        Self {
            up_color: theme.up,
            down_color: theme.down,
            time_from: viewport.time.from as f32,
            time_to: viewport.time.to as f32,
            volume_min: viewport.volume.min,
            volume_max: viewport.volume.max,
            // The volume strip carves the bottom fifth of NDC.
            base_y: -1.0,
            height: 0.4,
            bar_width: per_candle_width_ndc(bar_count),
            opacity: theme.volume_opacity,
        }
    }
}

/// Normalized per-candle width: the 2-unit NDC span divided across the
/// visible bars, with a 20% gap.
pub fn per_candle_width_ndc(bar_count: u32) -> f32 {
    2.0 / bar_count.max(1) as f32 * 0.8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_layout_matches_bar_record() {
        assert_eq!(BAR_INSTANCE_LAYOUT.array_stride, 24);
        assert_eq!(BAR_INSTANCE_LAYOUT.attributes[0].offset, 0);
        assert_eq!(BAR_INSTANCE_LAYOUT.attributes[1].offset, 4);
        assert_eq!(BAR_INSTANCE_LAYOUT.attributes[2].offset, 20);
    }

    #[test]
    fn test_candle_geometry_tags() {
        let geometry = candle_geometry();
        assert_eq!(geometry.len(), 18);
        assert!(geometry[0..6].iter().all(|v| v.kind == CANDLE_VERTEX_BODY));
        assert!(geometry[6..12]
            .iter()
            .all(|v| v.kind == CANDLE_VERTEX_UPPER_WICK));
        assert!(geometry[12..18]
            .iter()
            .all(|v| v.kind == CANDLE_VERTEX_LOWER_WICK));
    }

    #[test]
    fn test_volume_geometry_spans_unit_height() {
        let geometry = volume_geometry();
        assert_eq!(geometry.len(), 6);
        assert!(geometry.iter().all(|v| v.corner[1] == 0.0 || v.corner[1] == 1.0));
    }

    #[test]
    fn test_expand_polyline_strip_shape() {
        let points = [[0.0, 1.0], [1.0, 2.0], [2.0, 1.5]];
        let strip = expand_polyline(&points);
        assert_eq!(strip.len(), 6);
        // Sides alternate within each pair.
        assert_eq!(strip[0].side, -1.0);
        assert_eq!(strip[1].side, 1.0);
        // The last point pairs backwards.
        assert_eq!(strip[4].pos, [2.0, 1.5]);
        assert_eq!(strip[4].other, [1.0, 2.0]);
    }

    #[test]
    fn test_expand_polyline_degenerate() {
        assert!(expand_polyline(&[]).is_empty());
        assert!(expand_polyline(&[[1.0, 1.0]]).is_empty());
    }

    #[test]
    fn test_per_candle_width() {
        assert!(per_candle_width_ndc(100) > per_candle_width_ndc(1000));
        assert!(per_candle_width_ndc(0) > 0.0);
    }
}
