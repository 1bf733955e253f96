// crates/fv_physics/tests/partitions.rs

//! 多分区一致性测试
//!
//! 同一套网格按 1/2/4 个分区运行，集体归约得到的量在各分区上逐位相同，
//! 并与单分区结果一致。

use fv_config::{InitialRegionConfig, RegionConfig, SolverConfig, TimeStepType};
use fv_physics::engine::N_FLUX;
use fv_physics::{
    BoxMeshParams, Communicator, FixedIncrementSystem, Increment, LocalCluster, Mesh, OutputSink,
    PhysicsError, PhysicsResult, PrimitiveState, RestartSnapshot, SerialComm, Solver, StepReport,
};
use glam::DVec3;

fn cfl_config() -> SolverConfig {
    let mut config = SolverConfig::default();
    config.time_marching.number_of_steps = 3;
    config.time_marching.step.step_type = TimeStepType::CflMax;
    config.time_marching.step.cfl = 0.5;
    config.initial_conditions = vec![
        InitialRegionConfig {
            region: RegionConfig::All,
            pressure: 1e5,
            velocity: [5.0, 0.0, 0.0],
            temperature: 300.0,
        },
        // 右侧高速区决定全局最小 dt
        InitialRegionConfig {
            region: RegionConfig::Box { corner_1: [6.0, -1.0, -1.0], corner_2: [8.0, 3.0, 1.0] },
            pressure: 1e5,
            velocity: [80.0, 10.0, 0.0],
            temperature: 350.0,
        },
    ];
    config
}

fn box_mesh() -> BoxMeshParams {
    BoxMeshParams::rectangle(8, 2, 8.0, 2.0)
}

fn run_partitioned(partitions: usize) -> Vec<Vec<StepReport>> {
    let parts = box_mesh().build_partitions(partitions).unwrap();
    let config = cfl_config();
    LocalCluster::new(partitions).run(|comm| {
        let linear = FixedIncrementSystem::default().with_increment(Increment {
            dp: 10.0,
            dv: DVec3::new(0.1, 0.0, 0.0),
            dt: 0.01,
        });
        let mut solver = Solver::new(config.clone(), parts[comm.rank()].clone(), &comm)
            .unwrap()
            .with_linear_system(linear);
        (0..3).map(|_| solver.advance_step().unwrap()).collect()
    })
}

#[test]
fn test_cfl_max_dt_identical_on_all_partitions() {
    for partitions in [2, 4] {
        let reports = run_partitioned(partitions);
        for rank_reports in &reports[1..] {
            for (a, b) in reports[0].iter().zip(rank_reports) {
                assert_eq!(a.dt.to_bits(), b.dt.to_bits());
                assert_eq!(a.cfl_max.to_bits(), b.cfl_max.to_bits());
                assert_eq!(a.residuals, b.residuals);
            }
        }
        for r in &reports[0] {
            assert!((r.cfl_max - 0.5).abs() < 1e-12, "cfl_max = {}", r.cfl_max);
        }
    }
}

#[test]
fn test_partitioned_matches_serial() {
    let mesh = box_mesh().build_partitions(1).unwrap().remove(0);
    let comm = SerialComm;
    let linear = FixedIncrementSystem::default().with_increment(Increment {
        dp: 10.0,
        dv: DVec3::new(0.1, 0.0, 0.0),
        dt: 0.01,
    });
    let mut solver = Solver::new(cfl_config(), mesh, &comm)
        .unwrap()
        .with_linear_system(linear);
    let serial: Vec<StepReport> = (0..3).map(|_| solver.advance_step().unwrap()).collect();

    let partitioned = run_partitioned(2);
    for (s, p) in serial.iter().zip(&partitioned[0]) {
        assert_eq!(s.dt, p.dt);
        assert!((s.time - p.time).abs() < 1e-15);
        assert!((s.residuals.p - p.residuals.p).abs() <= 1e-12 * s.residuals.p);
    }
}

#[test]
fn test_global_cell_count() {
    let parts = box_mesh().build_partitions(2).unwrap();
    let config = cfl_config();
    let counts = LocalCluster::new(2).run(|comm| {
        let solver = Solver::new(config.clone(), parts[comm.rank()].clone(), &comm).unwrap();
        let n_owned = solver.mesh().n_owned();
        (solver.context().global_cell_count(), n_owned)
    });
    assert_eq!(counts, vec![(16, 8), (16, 8)]);
}

// ============================================================
// 致命错误在所有分区一致中止
// ============================================================

#[test]
fn test_linear_failure_on_one_partition_aborts_all() {
    let parts = box_mesh().build_partitions(2).unwrap();
    let config = cfl_config();
    let results = LocalCluster::new(2).run(|comm| {
        let linear = if comm.rank() == 0 {
            FixedIncrementSystem::default().fail_at_solve(2)
        } else {
            FixedIncrementSystem::default()
        };
        let mut solver = Solver::new(config.clone(), parts[comm.rank()].clone(), &comm)
            .unwrap()
            .with_linear_system(linear);
        let err = solver.run().unwrap_err();
        (solver.step(), err)
    });

    for (rank, (step, err)) in results.iter().enumerate() {
        assert_eq!(*step, 1, "rank {}", rank);
        match err {
            PhysicsError::LinearSolve { step, substep, .. } => {
                assert_eq!(*step, 2);
                assert_eq!(*substep, 1);
            }
            other => panic!("rank {}: unexpected error: {}", rank, other),
        }
    }
}

/// 在指定分区写探针时失败的输出
struct FailingOutputs {
    failing_rank: usize,
    rank: usize,
}

impl OutputSink for FailingOutputs {
    fn diagnostics(&mut self, _report: &StepReport) -> PhysicsResult<()> {
        Ok(())
    }

    fn restart(&mut self, _snapshot: &RestartSnapshot, comm: &dyn Communicator) -> PhysicsResult<()> {
        comm.barrier();
        Ok(())
    }

    fn fields(&mut self, _step: usize, _time: f64, _mesh: &Mesh, _cells: &[PrimitiveState]) -> PhysicsResult<()> {
        Ok(())
    }

    fn probes(&mut self, _step: usize, _time: f64, _cells: &[PrimitiveState]) -> PhysicsResult<()> {
        if self.rank == self.failing_rank {
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "磁盘已满").into());
        }
        Ok(())
    }

    fn boundary_fluxes(&mut self, _step: usize, _time: f64, _name: &str, _flux: &[f64; N_FLUX]) -> PhysicsResult<()> {
        Ok(())
    }
}

#[test]
fn test_output_failure_on_one_partition_aborts_all() {
    let parts = box_mesh().build_partitions(2).unwrap();
    let mut config = cfl_config();
    config.output.probe_freq = 2;
    config.output.restart_freq = 1;
    let results = LocalCluster::new(2).run(|comm| {
        let outputs = FailingOutputs { failing_rank: 1, rank: comm.rank() };
        let mut solver = Solver::new(config.clone(), parts[comm.rank()].clone(), &comm)
            .unwrap()
            .with_outputs(outputs);
        let err = solver.run().unwrap_err();
        (solver.step(), err)
    });

    assert_eq!(results[0].0, 2);
    assert_eq!(results[1].0, 2);
    assert!(matches!(results[0].1, PhysicsError::PeerFailed { rank: 0, .. }));
    assert!(matches!(results[1].1, PhysicsError::Io(_)));
}
