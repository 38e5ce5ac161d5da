//! Inverse kinematics for skitter legs.
//!
//! Provides a fixed-topology joint chain and a derivative-free gradient
//! descent solver that bends the chain toward a moving foot target.
//!
//! # Architecture
//!
//! ```text
//! ChainBuilder ──► JointChain ──► GradientSolver ──► joint angles (in place)
//! ```
//!
//! The [`JointChain`] is assembled once per leg and owned by it. Every frame
//! the leg moves the chain base with the body and calls
//! [`GradientSolver::solve`], which estimates each joint's slope by trial
//! rotation and steps downhill on the end-effector-to-target distance.

pub mod chain;
pub mod solver;

pub use chain::{ChainBuilder, ChainJoint, JointAxis, JointChain, JointSpec};
pub use solver::{GradientSolver, IkReport};
