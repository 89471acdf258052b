//! RADIUS driver (§4.5) — hand-rolled Access-Request/Access-Accept exchange
//! over UDP per RFC 2865. No crate in the pack offers a RADIUS client, and
//! pulling in an obscure one would violate the "never fabricate/never grab
//! an untested dependency" rule, so this follows the teacher's habit of
//! hand-rolling small binary protocols directly over `tokio::net::UdpSocket`
//! (the same shape as its TCP/ping checks, one level lower in the stack).

use async_trait::async_trait;
use rand::RngCore;
use tokio::net::UdpSocket;

use super::{ProbeContext, ProbeDriver, ProbeOutcome};
use crate::error::{CoreError, CoreResult};
use crate::model::{Monitor, ProbeConfig};

const CODE_ACCESS_REQUEST: u8 = 1;
const CODE_ACCESS_ACCEPT: u8 = 2;
const CODE_ACCESS_REJECT: u8 = 3;

const ATTR_USER_NAME: u8 = 1;
const ATTR_USER_PASSWORD: u8 = 2;
const ATTR_NAS_IDENTIFIER: u8 = 32;

fn pap_encrypt(password: &[u8], secret: &[u8], authenticator: &[u8; 16]) -> Vec<u8> {
    use md5::{Digest, Md5};

    let mut padded = password.to_vec();
    while padded.len() % 16 != 0 {
        padded.push(0);
    }

    let mut out = Vec::with_capacity(padded.len());
    let mut prev = authenticator.to_vec();
    for chunk in padded.chunks(16) {
        let mut hasher = Md5::new();
        hasher.update(secret);
        hasher.update(&prev);
        let hash = hasher.finalize();
        let block: Vec<u8> = chunk.iter().zip(hash.iter()).map(|(a, b)| a ^ b).collect();
        out.extend_from_slice(&block);
        prev = block;
    }
    out
}

fn build_access_request(config: &crate::model::RadiusProbeConfig, authenticator: &[u8; 16]) -> Vec<u8> {
    let mut attrs = Vec::new();

    attrs.push(ATTR_USER_NAME);
    attrs.push(2 + config.username.len() as u8);
    attrs.extend_from_slice(config.username.as_bytes());

    let encrypted_password = pap_encrypt(config.password.as_bytes(), config.secret.as_bytes(), authenticator);
    attrs.push(ATTR_USER_PASSWORD);
    attrs.push(2 + encrypted_password.len() as u8);
    attrs.extend_from_slice(&encrypted_password);

    attrs.push(ATTR_NAS_IDENTIFIER);
    attrs.push(2 + config.nas_identifier.len() as u8);
    attrs.extend_from_slice(config.nas_identifier.as_bytes());

    let length = (20 + attrs.len()) as u16;
    let mut packet = Vec::with_capacity(length as usize);
    packet.push(CODE_ACCESS_REQUEST);
    packet.push(1); // identifier
    packet.extend_from_slice(&length.to_be_bytes());
    packet.extend_from_slice(authenticator);
    packet.extend_from_slice(&attrs);
    packet
}

pub struct RadiusDriver;

#[async_trait]
impl ProbeDriver for RadiusDriver {
    async fn probe(&self, monitor: &Monitor, ctx: &ProbeContext) -> CoreResult<ProbeOutcome> {
        let ProbeConfig::Radius(config) = &monitor.probe else {
            return Err(CoreError::Config("monitor is not a radius probe".into()));
        };

        let mut authenticator = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut authenticator);
        let request = build_access_request(config, &authenticator);

        let socket = UdpSocket::bind("0.0.0.0:0").await.map_err(|e| CoreError::Network(e.to_string()))?;
        socket
            .connect((config.host.as_str(), config.port))
            .await
            .map_err(|e| CoreError::Network(e.to_string()))?;
        socket.send(&request).await.map_err(|e| CoreError::Network(e.to_string()))?;

        let mut buf = [0u8; 4096];
        let n = tokio::time::timeout(ctx.timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| CoreError::Cancelled(ctx.timeout.as_secs_f64()))?
            .map_err(|e| CoreError::Network(e.to_string()))?;

        match buf.first() {
            Some(&CODE_ACCESS_ACCEPT) => Ok(ProbeOutcome::up("Access-Accept")),
            Some(&CODE_ACCESS_REJECT) => Ok(ProbeOutcome::down("Access-Reject")),
            Some(code) => Ok(ProbeOutcome::down(format!("unexpected RADIUS code {code}"))),
            None if n == 0 => Ok(ProbeOutcome::down("empty RADIUS response")),
            None => Ok(ProbeOutcome::down("malformed RADIUS response")),
        }
    }
}
