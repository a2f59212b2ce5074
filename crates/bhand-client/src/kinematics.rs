//! 关节角度与力矩换算（纯函数）
//!
//! 8 个输出关节的排列：
//!
//! | 下标 | 关节 |
//! |------|------|
//! | 0, 3 | 张开轴（两个手指共享） |
//! | 1, 2 | 手指 1 近端 / 远端 |
//! | 4, 5 | 手指 2 近端 / 远端 |
//! | 6, 7 | 手指 3 近端 / 远端 |

use bhand_driver::HandTelemetry;
use bhand_protocol::Puck;
use std::f64::consts::PI;

/// 输出关节数
pub const JOINT_COUNT: usize = 8;

/// 张开轴：π 弧度对应的编码器计数
pub const SPREAD_COUNTS_PER_PI: f64 = 35840.0;

/// 电机编码器每圈计数
pub const ENCODER_COUNTS_PER_REV: f64 = 4096.0;

/// 关节编码器减速比
pub const JOINT_ENCODER_RATIO: f64 = 50.0;

/// 近端到远端的机械耦合系数
pub const DISTAL_COUPLING: f64 = 0.3333;

/// 每个手指的 (近端, 远端) 关节下标
pub const FINGER_JOINTS: [(usize, usize); 3] = [(1, 2), (4, 5), (6, 7)];

/// 每个输出关节的力矩来源 puck
pub const TORQUE_SOURCE: [Puck; JOINT_COUNT] = [
    Puck::Spread,
    Puck::Finger1,
    Puck::Finger1,
    Puck::Spread,
    Puck::Finger2,
    Puck::Finger2,
    Puck::Finger3,
    Puck::Finger3,
];

/// 手指电机编码器到关节角度的传动系数
const FINGER_MOTOR_GAIN: f64 = 1.0 / 125.0 + 1.0 / 375.0;

/// 固定关节配置 `[spread, f1, f2, f3]` 展开为 8 个关节角度
pub fn constant_joint_positions(c: &[f64; 4]) -> [f64; JOINT_COUNT] {
    [
        c[0],
        c[1],
        c[1] * DISTAL_COUPLING,
        c[0],
        c[2],
        c[2] * DISTAL_COUPLING,
        c[3],
        c[3] * DISTAL_COUPLING,
    ]
}

/// 张开轴编码器计数 → 弧度
#[inline]
pub fn spread_angle(counts: i32) -> f64 {
    counts as f64 * PI / SPREAD_COUNTS_PER_PI
}

/// 手指编码器 → (近端角度, 远端角度)
pub fn finger_angles(motor_counts: i32, joint_counts: i32) -> (f64, f64) {
    let inner = 2.0 * PI / ENCODER_COUNTS_PER_REV * joint_counts as f64 / JOINT_ENCODER_RATIO;
    let outer = 2.0 * PI / ENCODER_COUNTS_PER_REV * motor_counts as f64 * FINGER_MOTOR_GAIN - inner;
    (inner, outer)
}

/// 由遥测计算 8 个关节角度
pub fn joint_positions(telemetry: &HandTelemetry) -> [f64; JOINT_COUNT] {
    let mut q = [0.0; JOINT_COUNT];
    let spread = spread_angle(telemetry.get(Puck::Spread).position);
    q[0] = spread;
    q[3] = spread;

    for (puck, &(inner_idx, outer_idx)) in Puck::FINGERS.iter().zip(FINGER_JOINTS.iter()) {
        let t = telemetry.get(*puck);
        let (inner, outer) = finger_angles(t.position, t.secondary);
        q[inner_idx] = inner;
        q[outer_idx] = outer;
    }
    q
}

/// 由电机电流得到 8 个关节力矩
pub fn joint_torques(telemetry: &HandTelemetry) -> [f64; JOINT_COUNT] {
    TORQUE_SOURCE.map(|puck| telemetry.get(puck).current as f64)
}

// ============================================================================
// 设备单位换算
// ============================================================================

/// 手指关节弧度 → 电机编码器计数
#[inline]
pub fn rad_to_finger_counts(rad: f64) -> f64 {
    rad * 180.0 * 199_111.1 / (3.1416 * 140.0)
}

/// 张开轴弧度 → 编码器计数
#[inline]
pub fn rad_to_spread_counts(rad: f64) -> f64 {
    rad * SPREAD_COUNTS_PER_PI / PI
}

/// 关节弧度 → 对应 puck 的编码器计数
#[inline]
pub fn joint_to_counts(puck: Puck, rad: f64) -> f64 {
    if puck.is_spread() {
        rad_to_spread_counts(rad)
    } else {
        rad_to_finger_counts(rad)
    }
}

/// 计数/秒 → 计数/毫秒（截断为整数）
#[inline]
pub fn velocity_to_counts_per_ms(counts_per_s: f64) -> i32 {
    (counts_per_s / 1000.0) as i32
}
