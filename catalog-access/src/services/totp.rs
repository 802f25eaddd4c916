//! Time-based one-time passwords (RFC 6238 over RFC 4226 truncation).

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::ServiceError;

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotpAlgorithm {
    Sha1,
    Sha256,
}

impl std::str::FromStr for TotpAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sha1" => Ok(TotpAlgorithm::Sha1),
            "sha256" => Ok(TotpAlgorithm::Sha256),
            _ => Err(format!("Invalid TOTP algorithm: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotpParams {
    pub step_seconds: i64,
    pub epoch_seconds: i64,
    pub digits: u32,
    pub algorithm: TotpAlgorithm,
    /// Adjacent windows accepted on either side of the current one.
    pub drift_windows: u32,
}

impl Default for TotpParams {
    fn default() -> Self {
        Self {
            step_seconds: 300,
            epoch_seconds: 0,
            digits: 6,
            algorithm: TotpAlgorithm::Sha1,
            drift_windows: 1,
        }
    }
}

impl TotpParams {
    /// `floor((now - epoch) / step)`.
    pub fn counter_at(&self, now_seconds: i64) -> i64 {
        (now_seconds - self.epoch_seconds).div_euclid(self.step_seconds.max(1))
    }
}

fn hmac_digest(
    algorithm: TotpAlgorithm,
    secret: &[u8],
    message: &[u8],
) -> Result<Vec<u8>, ServiceError> {
    let digest = match algorithm {
        TotpAlgorithm::Sha1 => {
            let mut mac = HmacSha1::new_from_slice(secret)
                .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;
            mac.update(message);
            mac.finalize().into_bytes().to_vec()
        }
        TotpAlgorithm::Sha256 => {
            let mut mac = HmacSha256::new_from_slice(secret)
                .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;
            mac.update(message);
            mac.finalize().into_bytes().to_vec()
        }
    };

    Ok(digest)
}

/// The code for `counter`, truncated to `params.digits` decimal digits.
pub fn generate(secret: &[u8], counter: u64, params: &TotpParams) -> Result<u32, ServiceError> {
    let digest = hmac_digest(params.algorithm, secret, &counter.to_be_bytes())?;

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = (u32::from(digest[offset] & 0x7f) << 24)
        | (u32::from(digest[offset + 1]) << 16)
        | (u32::from(digest[offset + 2]) << 8)
        | u32::from(digest[offset + 3]);

    let modulus = 10u32.checked_pow(params.digits).ok_or_else(|| {
        anyhow::anyhow!("TOTP digits out of range: {}", params.digits)
    })?;

    Ok(binary % modulus)
}

fn format_code(code: u32, digits: u32) -> String {
    format!("{:0width$}", code, width = digits as usize)
}

/// Check `code` against `counter` and its drift neighbours. Returns the
/// counter that matched.
pub fn verify(
    secret: &[u8],
    code: u32,
    counter: i64,
    params: &TotpParams,
) -> Result<Option<i64>, ServiceError> {
    let submitted = format_code(code, params.digits);
    let drift = i64::from(params.drift_windows);

    // Current window first, then outward.
    let mut candidates = vec![counter];
    for d in 1..=drift {
        candidates.push(counter - d);
        candidates.push(counter + d);
    }

    for candidate in candidates {
        let Ok(unsigned) = u64::try_from(candidate) else {
            continue;
        };
        let expected = format_code(generate(secret, unsigned, params)?, params.digits);
        if expected.len() == submitted.len()
            && bool::from(expected.as_bytes().ct_eq(submitted.as_bytes()))
        {
            return Ok(Some(candidate));
        }
    }

    Ok(None)
}
