use serde::{
    Deserialize,
    Serialize
};

/// How one trace was positioned against its reference: the applied
/// `(x_offset, y_offset)` and the chi-square per point at that offset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    x_offset: f64,
    y_offset: f64,
    chi_square: f64,
    /// The x-offset ended within the railing tolerance of the pixel size.
    #[serde(default)]
    railed: bool,
}

impl FitResult {
    pub fn new(x_offset: f64, y_offset: f64, chi_square: f64) -> FitResult {
        FitResult { x_offset, y_offset, chi_square, railed: false }
    }

    pub fn zero() -> FitResult {
        FitResult::default()
    }

    pub(crate) fn with_railed(mut self, railed: bool) -> FitResult {
        self.railed = railed;
        self
    }

    pub fn x_offset(&self) -> f64 {
        self.x_offset
    }

    pub fn y_offset(&self) -> f64 {
        self.y_offset
    }

    pub fn chi_square(&self) -> f64 {
        self.chi_square
    }

    pub fn railed(&self) -> bool {
        self.railed
    }

    /// `[x_offset, y_offset, chi_square]`.
    pub fn as_triple(&self) -> [f64; 3] {
        [self.x_offset, self.y_offset, self.chi_square]
    }
}
