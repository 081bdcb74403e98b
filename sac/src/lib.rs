mod align;
mod base;
mod config;
mod cylinder;
mod error;
mod fitter;
mod inliers;
mod line;
mod pipeline;
mod refine;

pub use self::{
    align::CoordinateAligner,
    base::{PcSac, Ransac, SacModel},
    config::FittingConfig,
    cylinder::{Cylinder, CylinderEstimator, NormalCylinder, Oriented},
    error::{Error, Result},
    fitter::{CylinderFit, CylinderFitter},
    inliers::{HeightEstimator, InlierRefiner},
    line::Line,
    pipeline::{CylinderFittingPipeline, FittingResult, ShapeFitter, ShapeKind},
    refine::{LevenbergMarquardt, RefinementError, Refined},
};
