//! IK 演示
//!
//! 一条手臂跟随绕圈移动的目标，输出每帧末端误差。
//! 运行：cargo run --features demo --bin ik_demo

use glam::{Quat, Vec3};
use limb_ik_engine::{
    BendModifier, IkRig, IkSolver, LimbSolver, Result, RotationLimit, Skeleton, UpdateMode,
};

const FRAMES: usize = 120;
const DELTA: f32 = 1.0 / 60.0;

fn build_arm() -> Result<(Skeleton, [usize; 3])> {
    let mut skeleton = Skeleton::new();
    let clavicle = skeleton.add_joint("clavicle", None, Vec3::new(0.0, 1.4, 0.0), Quat::IDENTITY)?;
    let upper = skeleton.add_joint("LeftArm", Some(clavicle), Vec3::new(0.15, 0.0, 0.0), Quat::IDENTITY)?;
    let fore = skeleton.add_joint("LeftForeArm", Some(upper), Vec3::new(0.28, 0.0, -0.03), Quat::IDENTITY)?;
    let hand = skeleton.add_joint("LeftHand", Some(fore), Vec3::new(0.25, 0.0, 0.03), Quat::IDENTITY)?;
    Ok((skeleton, [upper, fore, hand]))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (skeleton, [upper, fore, hand]) = build_arm()?;
    let mut rig = IkRig::new(skeleton);
    rig.update_mode = UpdateMode::FixedStep(DELTA);
    rig.set_limit(upper, RotationLimit::angle(Vec3::X, 80.0, 60.0)?)?;

    let limb = LimbSolver::new(upper, fore, hand).with_bend_modifier(BendModifier::Parent);
    let solver = rig.add_solver(limb);
    rig.initiate();

    for warning in rig.diagnostics().surfaced() {
        log::warn!("{}: {}", warning.code, warning.context);
    }

    let shoulder = rig.skeleton.position(upper);
    let mut worst: f32 = 0.0;
    for frame in 0..FRAMES {
        let t = frame as f32 * DELTA * std::f32::consts::TAU;
        let target = shoulder + Vec3::new(0.35, 0.2 * t.sin(), 0.2 * t.cos());

        if let Some(IkSolver::Limb(limb)) = rig.solver_mut(solver) {
            limb.set_target(target, Quat::IDENTITY);
        }
        if !rig.tick(DELTA) {
            continue;
        }

        let error = (rig.skeleton.position(hand) - target).length();
        worst = worst.max(error);
        if frame % 20 == 0 {
            log::info!("[Demo] 帧 {:3}: 目标 {:?}, 误差 {:.5}", frame, target, error);
        }
    }

    log::info!("[Demo] 完成: {} 帧, 最大误差 {:.5}", FRAMES, worst);
    Ok(())
}
