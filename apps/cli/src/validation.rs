//! 输入验证模块

use anyhow::Result;

/// 关节名称（与 `MoveRequest::q` 顺序一致）
pub const JOINT_NAMES: [&str; 4] = ["F1", "F2", "F3", "Spread"];

/// 关节角度验证器
pub struct JointValidator {
    /// 最小角度（弧度）
    min_angle: f64,
    /// 最大角度（弧度）
    max_angle: f64,
}

impl JointValidator {
    /// # 参数
    /// * `min_angle` - 最小角度（弧度），默认 0
    /// * `max_angle` - 最大角度（弧度），默认 π
    pub fn new(min_angle: Option<f64>, max_angle: Option<f64>) -> Self {
        Self {
            min_angle: min_angle.unwrap_or(0.0),
            max_angle: max_angle.unwrap_or(std::f64::consts::PI),
        }
    }

    /// 使用默认范围创建验证器（0 到 π）
    pub fn default_range() -> Self {
        Self::new(None, None)
    }

    /// 验证并转换为 `[f1, f2, f3, spread]`
    ///
    /// # 错误
    /// - 数量不是 4 个
    /// - 任何值为 NaN 或无穷大
    /// - 任何值超出范围
    pub fn validate(&self, values: &[f64]) -> Result<[f64; 4]> {
        let Ok(joints) = <[f64; 4]>::try_from(values) else {
            anyhow::bail!("需要 4 个关节角度，得到 {} 个", values.len());
        };

        for (name, &value) in JOINT_NAMES.iter().zip(joints.iter()) {
            if !value.is_finite() {
                anyhow::bail!("关节 {} 角度无效: {}", name, value);
            }
            if value < self.min_angle || value > self.max_angle {
                anyhow::bail!(
                    "关节 {} 角度 {:.3} rad 超出范围 [{:.3}, {:.3}]",
                    name,
                    value,
                    self.min_angle,
                    self.max_angle
                );
            }
        }
        Ok(joints)
    }
}

/// 解析整数（支持 `0x` 前缀的十六进制）
pub fn parse_int(s: &str) -> Result<u32> {
    let s = s.trim();
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16)?,
        None => s.parse()?,
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_in_range() {
        let v = JointValidator::default_range();
        assert_eq!(v.validate(&[1.0, 1.5, 2.0, 0.0]).unwrap(), [1.0, 1.5, 2.0, 0.0]);
    }

    #[test]
    fn test_validate_rejects_wrong_count() {
        let v = JointValidator::default_range();
        let err = v.validate(&[1.0, 1.0, 1.0]).unwrap_err();
        assert!(err.to_string().contains("4"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_and_nan() {
        let v = JointValidator::default_range();
        assert!(v.validate(&[1.0, 1.0, 1.0, 4.0]).is_err());
        assert!(v.validate(&[-0.1, 1.0, 1.0, 1.0]).is_err());
        assert!(v.validate(&[f64::NAN, 1.0, 1.0, 1.0]).is_err());

        let wide = JointValidator::new(Some(-1.0), Some(5.0));
        assert!(wide.validate(&[-0.5, 1.0, 1.0, 4.0]).is_ok());
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("0x566").unwrap(), 0x566);
        assert_eq!(parse_int("0X1f").unwrap(), 0x1F);
        assert_eq!(parse_int("11").unwrap(), 11);
        assert!(parse_int("0xZZ").is_err());
        assert!(parse_int("abc").is_err());
    }
}
