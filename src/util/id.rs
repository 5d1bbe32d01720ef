use ring::rand::{SecureRandom, SystemRandom};
use anyhow::{anyhow, Result};
use crate::util::time::unix_millis;

const SUFFIX_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// 生成构建 ID：`app_{毫秒时间戳}_{9 位 base36 随机串}`
///
/// 不做碰撞重试，数据库上的唯一约束兜底。
pub fn generate_app_id() -> Result<String> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; SUFFIX_LEN];
    rng.fill(&mut bytes)
        .map_err(|_| anyhow!("Failed to generate random app id suffix"))?;

    let suffix: String = bytes
        .iter()
        .map(|b| BASE36[(*b as usize) % BASE36.len()] as char)
        .collect();

    Ok(format!("app_{}_{}", unix_millis(), suffix))
}
