mod normal;

pub use self::normal::NormalEstimation;
