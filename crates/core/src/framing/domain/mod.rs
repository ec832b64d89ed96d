pub mod area_resampler;
pub mod aspect_preset;
pub mod crop_geometry;
pub mod pan_rate_limiter;
pub mod trajectory_smoother;
