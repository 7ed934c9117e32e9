/// Separable Gaussian blur on premultiplied RGBA8.
pub mod blur;
/// Source-over compositing and scaled overlays.
pub mod composite;
/// Watermark-region planning.
pub mod regions;
