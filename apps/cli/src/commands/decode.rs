//! 帧解析命令
//!
//! 把一帧原始 CAN 数据解释为 puck 协议内容，用于排查总线抓包。

use crate::validation::parse_int;
use anyhow::{Context, Result};
use bhand_protocol::ids::{
    GROUP_FLAG, GROUP_POSITION_FEEDBACK, GROUP_PROPERTY_REPLY, GROUP_TACTILE_FULL,
};
use bhand_protocol::{
    CommandCode, Property, PuckFrame, PuckMode, SET_FLAG, decode_encoder_pair,
    decode_scalar_reply, decode_tactile, reply_property,
};
use clap::Args;

/// 帧解析参数
#[derive(Args, Debug)]
pub struct DecodeCommand {
    /// CAN ID（十进制或 0x 前缀十六进制）
    pub id: String,

    /// 数据（十六进制，最多 8 字节，如 `88000500`）
    #[arg(default_value = "")]
    pub data: String,
}

impl DecodeCommand {
    pub fn execute(&self) -> Result<()> {
        let frame = self.parse()?;
        println!("ID=0x{:03X} data=[{}]", frame.id, hex::encode_upper(frame.data_slice()));
        for line in describe(&frame) {
            println!("  {}", line);
        }
        Ok(())
    }

    fn parse(&self) -> Result<PuckFrame> {
        let id = parse_int(&self.id).with_context(|| format!("无效的 CAN ID: {}", self.id))?;
        if id > 0x7FF {
            anyhow::bail!("CAN ID 0x{:X} 超出标准帧范围", id);
        }
        let cleaned: String = self.data.chars().filter(|c| !c.is_whitespace()).collect();
        let data = hex::decode(&cleaned).with_context(|| format!("无效的十六进制数据: {}", self.data))?;
        if data.len() > 8 {
            anyhow::bail!("数据长度 {} 超过 8 字节", data.len());
        }
        Ok(PuckFrame::new(id, &data))
    }
}

fn property_name(id: u8) -> String {
    match Property::try_from(id) {
        Ok(p) => format!("{:?}({})", p, id),
        Err(_) => format!("#{}", id),
    }
}

/// 值的附加解释（模式名、命令名）
fn value_hint(property: u8, value: i32) -> Option<String> {
    let code = u8::try_from(value).ok()?;
    match Property::try_from(property).ok()? {
        Property::Mode => PuckMode::from_raw(value).map(|m| format!("{:?}", m)),
        Property::Cmd => CommandCode::try_from(code).ok().map(|c| format!("{:?}", c)),
        _ => None,
    }
}

/// 逐行描述一帧
pub fn describe(frame: &PuckFrame) -> Vec<String> {
    let mut lines = Vec::new();

    if frame.id & GROUP_FLAG != 0 {
        let from = (frame.id >> 5) & 0x1F;
        let to = frame.id & 0x1F;
        match to {
            GROUP_PROPERTY_REPLY => {
                let Some(property) = reply_property(frame) else {
                    lines.push(format!("属性应答 (来自 {})：空帧", from));
                    return lines;
                };
                let value = decode_scalar_reply(frame);
                lines.push(format!("属性应答 (来自 {})", from));
                lines.push(format!("{} = {}", property_name(property), value));
                if let Some(hint) = value_hint(property, value) {
                    lines.push(format!("即 {}", hint));
                }
            },
            GROUP_POSITION_FEEDBACK => {
                let (motor, joint) = decode_encoder_pair(frame);
                lines.push(format!("编码器应答 (来自 {})", from));
                lines.push(format!("电机编码器 = {}", motor));
                lines.push(format!("关节编码器 = {}", joint));
            },
            GROUP_TACTILE_FULL => {
                let tactile = decode_tactile(frame);
                lines.push(format!("触觉应答 (来自 {})", from));
                lines.push(format!("组 {} 单元 {:?}", tactile.group, tactile.cells));
            },
            _ => {
                lines.push(format!("组播 {} → 组 {}", from, to));
                describe_request(frame, &mut lines);
            },
        }
    } else {
        lines.push(format!("发往 puck {}", frame.id));
        describe_request(frame, &mut lines);
    }
    lines
}

/// 读写请求
fn describe_request(frame: &PuckFrame, lines: &mut Vec<String>) {
    let data = frame.data_slice();
    let Some(&first) = data.first() else {
        lines.push("空帧".to_string());
        return;
    };
    let property = first & !SET_FLAG;

    if first & SET_FLAG == 0 {
        lines.push(format!("GET {}", property_name(property)));
        return;
    }
    let value = decode_scalar_reply(frame);
    lines.push(format!("SET {} = {}", property_name(property), value));
    if let Some(hint) = value_hint(property, value) {
        lines.push(format!("即 {}", hint));
    }
}
