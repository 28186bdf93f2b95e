use crate::metadata::DistortionModel;

/// Backward mapping from corrected pixels to source coordinates, shared by
/// every slice of a chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct DistortionField {
    height: usize,
    width: usize,
    xd: Vec<f32>,
    yd: Vec<f32>,
}

impl DistortionField {
    /// Evaluates `model` over a `height × width` grid.
    ///
    /// For every pixel `(x, y)` with `xu = x - xc`, `yu = y - yc` and
    /// `r = sqrt(xu² + yu²)` the source is `(xc + f(r)·xu, yc + f(r)·yu)`,
    /// clipped into the image. Non-finite results map to 0.
    pub fn build(model: &DistortionModel, height: usize, width: usize) -> Self {
        let (xc, yc) = (model.x_center, model.y_center);
        let x_list: Vec<f64> = (0..width).map(|x| x as f64 - xc).collect();
        let y_list: Vec<f64> = (0..height).map(|y| y as f64 - yc).collect();

        let len = height * width;
        let mut mesh_x = Vec::with_capacity(len);
        let mut mesh_y = Vec::with_capacity(len);
        for &yu in &y_list {
            for &xu in &x_list {
                mesh_x.push(xu);
                mesh_y.push(yu);
            }
        }

        let radius: Vec<f64> = mesh_x
            .iter()
            .zip(&mesh_y)
            .map(|(xu, yu)| (xu * xu + yu * yu).sqrt())
            .collect();
        let poly: Vec<f64> = radius.iter().map(|&r| model.factor(r)).collect();

        let x_max = width.saturating_sub(1) as f64;
        let y_max = height.saturating_sub(1) as f64;
        let xd = poly
            .iter()
            .zip(&mesh_x)
            .map(|(f, xu)| clip(xc + f * xu, x_max))
            .collect();
        let yd = poly
            .iter()
            .zip(&mesh_y)
            .map(|(f, yu)| clip(yc + f * yu, y_max))
            .collect();

        Self {
            height,
            width,
            xd,
            yd,
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Source column per output pixel.
    pub fn xd(&self) -> &[f32] {
        &self.xd
    }

    /// Source row per output pixel.
    pub fn yd(&self) -> &[f32] {
        &self.yd
    }

    /// `max(yd) - min(yd)`.
    pub fn spread_y(&self) -> f32 {
        let (min, max) = self
            .yd
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if min > max {
            0.0
        } else {
            max - min
        }
    }

    /// Row coordinates followed by column coordinates, as the device kernel reads them.
    pub fn stacked(&self) -> Vec<f32> {
        let mut coords = Vec::with_capacity(self.yd.len() * 2);
        coords.extend_from_slice(&self.yd);
        coords.extend_from_slice(&self.xd);
        coords
    }
}

fn clip(value: f64, max: f64) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, max) as f32
}
