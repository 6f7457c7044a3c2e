pub mod distance;
pub mod integrity;
pub mod sampler;
