/// Extension of [`nalgebra::RealField`] with constants used by numerical
/// tolerances throughout the crate.
pub trait RealField: nalgebra::RealField {
    /// Machine epsilon.
    const EPSILON: Self;
    /// Square root of machine epsilon. A standard choice of tolerance for
    /// quantities that lost roughly half of their significant digits.
    const EPSILON_SQRT: Self;
}

impl RealField for f32 {
    const EPSILON: Self = f32::EPSILON;
    const EPSILON_SQRT: Self = 0.00034526698;
}

impl RealField for f64 {
    const EPSILON: Self = f64::EPSILON;
    const EPSILON_SQRT: Self = 0.000000014901161193847656;
}
