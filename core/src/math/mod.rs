pub mod fft;
pub mod stats;
pub mod window;

pub use fft::TransformResources;
pub use stats::StatsHelper;
pub use window::hamming;
