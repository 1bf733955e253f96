// crates/fv_physics/tests/outputs_restart.rs

//! 周期输出与重启续算

use fv_config::{
    BoundaryFluxConfig, InitialRegionConfig, ProbeConfig, RampConfig, RegionConfig, SolverConfig,
    TimeStepType,
};
use fv_physics::{BoxMeshParams, Communicator, FileOutputs, LocalCluster, Mesh, RestartSnapshot, SerialComm, Solver};
use std::path::Path;

fn config(dir: &Path) -> SolverConfig {
    let mut config = SolverConfig::default();
    config.time_marching.number_of_steps = 4;
    config.time_marching.step.step_type = TimeStepType::Fixed;
    config.time_marching.step.dt = 1e-3;
    config.time_marching.ramp = Some(RampConfig { initial: 1e-4, growth: 2.0 });
    config.initial_conditions = vec![InitialRegionConfig {
        region: RegionConfig::All,
        pressure: 1e5,
        velocity: [2.0, 0.0, 0.0],
        temperature: 300.0,
    }];
    config.output.directory = dir.to_path_buf();
    config.output.restart_freq = 2;
    config.output.output_freq = 4;
    config.output.probe_freq = 1;
    config.output.integrate_boundary_freq = 2;
    config.output.probes = vec![ProbeConfig { name: "mid".into(), position: [2.1, 0.0, 0.0] }];
    config.output.boundary_fluxes = vec![BoundaryFluxConfig { name: "outlet".into(), boundary: 1 }];
    config
}

fn mesh() -> Mesh {
    BoxMeshParams::line(4, 4.0).build_partitions(1).unwrap().remove(0)
}

fn line_count(path: &Path) -> usize {
    std::fs::read_to_string(path).unwrap().lines().count()
}

#[test]
fn test_periodic_outputs_written() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let comm = SerialComm;
    let outputs = FileOutputs::new(&config.output, &mesh(), &comm).unwrap();
    let mut solver = Solver::new(config, mesh(), &comm).unwrap().with_outputs(outputs);
    solver.run().unwrap();

    // 表头 + 每步一行
    assert_eq!(line_count(&dir.path().join("diagnostics.log")), 5);
    assert_eq!(line_count(&dir.path().join("probe_mid.dat")), 5);
    // 第 2、4 步积分
    assert_eq!(line_count(&dir.path().join("flux_outlet.dat")), 3);
    assert!(dir.path().join("restart_2_0.json").exists());
    assert!(dir.path().join("restart_4_0.json").exists());
    assert!(!dir.path().join("restart_3_0.json").exists());
    assert_eq!(line_count(&dir.path().join("field_4_0.dat")), 5);

    // 出口质量通量为正
    let flux = std::fs::read_to_string(dir.path().join("flux_outlet.dat")).unwrap();
    let mass: f64 = flux.lines().nth(1).unwrap().split('\t').nth(2).unwrap().parse().unwrap();
    assert!(mass > 0.0);
}

#[test]
fn test_restart_disables_ramp_and_continues_numbering() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let comm = SerialComm;

    let mut first = Solver::new(config.clone(), mesh(), &comm)
        .unwrap()
        .with_outputs(FileOutputs::new(&config.output, &mesh(), &comm).unwrap());
    assert!(first.time_step().is_ramping());
    let r1 = first.advance_step().unwrap();
    let r2 = first.advance_step().unwrap();
    assert!((r1.dt - 1e-4).abs() < 1e-18);
    assert!((r2.dt - 2e-4).abs() < 1e-18);
    let time_at_2 = first.time();

    let snapshot = RestartSnapshot::load(dir.path(), 2, 0).unwrap();
    assert_eq!(snapshot.step, 2);
    assert_eq!(snapshot.time, time_at_2);

    let mut resumed = Solver::new(config, mesh(), &comm)
        .unwrap()
        .resume_from(dir.path(), 2)
        .unwrap();
    assert!(!resumed.time_step().is_ramping());
    assert_eq!(resumed.time_step().dt_current(), 1e-3);

    let r3 = resumed.advance_step().unwrap();
    assert_eq!(r3.step, 3);
    assert_eq!(r3.dt, 1e-3);
    assert!((r3.time - (time_at_2 + 1e-3)).abs() < 1e-15);
}

#[test]
fn test_restart_written_by_every_partition() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.time_marching.number_of_steps = 2;
    let parts = BoxMeshParams::line(4, 4.0).build_partitions(2).unwrap();

    let steps = LocalCluster::new(2).run(|comm| {
        let mesh = parts[comm.rank()].clone();
        let outputs = FileOutputs::new(&config.output, &mesh, &comm).unwrap();
        let mut solver = Solver::new(config.clone(), mesh, &comm).unwrap().with_outputs(outputs);
        solver.run().unwrap().final_step
    });
    assert_eq!(steps, vec![2, 2]);
    for rank in 0..2 {
        let snap = RestartSnapshot::load(dir.path(), 2, rank).unwrap();
        assert_eq!(snap.rank, rank);
        assert_eq!(snap.partitions, 2);
    }
    // 探针只由一个分区写出
    assert_eq!(line_count(&dir.path().join("probe_mid.dat")), 3);
}

#[test]
fn test_restart_mismatch_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let comm = SerialComm;
    let mut solver = Solver::new(config.clone(), mesh(), &comm)
        .unwrap()
        .with_outputs(FileOutputs::new(&config.output, &mesh(), &comm).unwrap());
    solver.advance_step().unwrap();
    solver.advance_step().unwrap();

    let other = BoxMeshParams::line(5, 4.0).build_partitions(1).unwrap().remove(0);
    let result = Solver::new(config, other, &comm).unwrap().resume_from(dir.path(), 2);
    assert!(matches!(result, Err(fv_physics::PhysicsError::RestartMismatch { .. })));
}
