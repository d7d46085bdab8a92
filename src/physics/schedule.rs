//! Physics work units for an external scheduler.
//!
//! The pipeline is split into ordered stages. [`build_jobs`] hands one job per
//! stage to whatever task graph drives the engine; the caller runs them in
//! order through [`PhysicsWorld::run_stage`](super::PhysicsWorld::run_stage).

/// Engine-wide execution phases, in the order they run each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EnginePhase {
    /// Input handling and gameplay systems.
    GameLogic = 0,
    /// Collision detection and dynamics.
    Physics = 1,
    /// Copying simulation results to the renderer.
    RenderSync = 2,
}

/// One stage of a physics step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PhysicsStage {
    UpdateProxies,
    BroadPhase,
    NarrowPhase,
    Manifolds,
    Solve,
    Integrate,
    SyncTransforms,
}

impl PhysicsStage {
    /// Every stage in execution order.
    pub const ALL: [PhysicsStage; 7] = [
        PhysicsStage::UpdateProxies,
        PhysicsStage::BroadPhase,
        PhysicsStage::NarrowPhase,
        PhysicsStage::Manifolds,
        PhysicsStage::Solve,
        PhysicsStage::Integrate,
        PhysicsStage::SyncTransforms,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PhysicsStage::UpdateProxies => "physics.update_proxies",
            PhysicsStage::BroadPhase => "physics.broad_phase",
            PhysicsStage::NarrowPhase => "physics.narrow_phase",
            PhysicsStage::Manifolds => "physics.manifolds",
            PhysicsStage::Solve => "physics.solve",
            PhysicsStage::Integrate => "physics.integrate",
            PhysicsStage::SyncTransforms => "physics.sync_transforms",
        }
    }

    /// Stages that only read shared state and may be split across workers
    /// by the caller.
    pub fn is_read_only(self) -> bool {
        matches!(self, PhysicsStage::BroadPhase | PhysicsStage::NarrowPhase)
    }
}

/// A unit of work placed in the engine's task graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicsJob {
    pub phase: EnginePhase,
    pub stage: PhysicsStage,
    /// Position within the phase.
    pub order: u32,
}

impl PhysicsJob {
    pub fn name(&self) -> &'static str {
        self.stage.name()
    }
}

/// One job per stage, all in [`EnginePhase::Physics`], in execution order.
pub fn build_jobs() -> Vec<PhysicsJob> {
    PhysicsStage::ALL
        .iter()
        .zip(0u32..)
        .map(|(&stage, order)| PhysicsJob {
            phase: EnginePhase::Physics,
            stage,
            order,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_ordering() {
        assert!(EnginePhase::GameLogic < EnginePhase::Physics);
        assert!(EnginePhase::Physics < EnginePhase::RenderSync);
    }

    #[test]
    fn test_jobs_follow_stage_order() {
        let jobs = build_jobs();
        assert_eq!(jobs.len(), PhysicsStage::ALL.len());
        assert!(jobs.iter().all(|j| j.phase == EnginePhase::Physics));
        assert_eq!(jobs[0].stage, PhysicsStage::UpdateProxies);
        assert_eq!(jobs[6].stage, PhysicsStage::SyncTransforms);
        assert!(jobs.windows(2).all(|w| w[0].order < w[1].order && w[0].stage < w[1].stage));
        assert_eq!(jobs[4].name(), "physics.solve");
    }
}
