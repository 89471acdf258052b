//! DNS driver (§4.5, §6.1) — resolves one record type and reports the
//! answer set. Grounded in the teacher's `trust-dns-resolver`-based DNS
//! monitor; the per-record-type message formatting follows §6.1.

use std::time::Instant;

use async_trait::async_trait;
use trust_dns_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use trust_dns_resolver::proto::rr::RecordType;
use trust_dns_resolver::TokioAsyncResolver;

use super::{ProbeContext, ProbeDriver, ProbeOutcome};
use crate::error::{CoreError, CoreResult};
use crate::model::{DnsRecordType, Monitor, ProbeConfig};

fn record_type(rt: DnsRecordType) -> RecordType {
    match rt {
        DnsRecordType::A => RecordType::A,
        DnsRecordType::Aaaa => RecordType::AAAA,
        DnsRecordType::Cname => RecordType::CNAME,
        DnsRecordType::Caa => RecordType::CAA,
        DnsRecordType::Mx => RecordType::MX,
        DnsRecordType::Ns => RecordType::NS,
        DnsRecordType::Ptr => RecordType::PTR,
        DnsRecordType::Soa => RecordType::SOA,
        DnsRecordType::Srv => RecordType::SRV,
        DnsRecordType::Txt => RecordType::TXT,
    }
}

pub struct DnsDriver;

#[async_trait]
impl ProbeDriver for DnsDriver {
    async fn probe(&self, monitor: &Monitor, ctx: &ProbeContext) -> CoreResult<ProbeOutcome> {
        let ProbeConfig::Dns(config) = &monitor.probe else {
            return Err(CoreError::Config("monitor is not a dns probe".to_string()));
        };

        let server_group = NameServerConfigGroup::from_ips_clear(&[config.resolver_host.parse().map_err(|_| CoreError::Config(format!("bad resolver host: {}", config.resolver_host)))?], config.resolver_port, true);
        let resolver_config = ResolverConfig::from_parts(None, vec![], server_group);
        let mut opts = ResolverOpts::default();
        opts.timeout = ctx.timeout;
        let resolver = TokioAsyncResolver::tokio(resolver_config, opts);

        let start = Instant::now();
        let lookup = resolver
            .lookup(config.hostname.clone(), record_type(config.record_type))
            .await
            .map_err(|e| CoreError::Network(format!("{} lookup for {} failed: {e}", record_type_name(config.record_type), config.hostname)))?;
        let ping_ms = start.elapsed().as_millis() as i64;

        let answers: Vec<String> = lookup.iter().map(|r| r.to_string()).collect();
        if answers.is_empty() {
            return Ok(ProbeOutcome::down(format!("{} record not found for {}", record_type_name(config.record_type), config.hostname)).with_ping(ping_ms));
        }

        let joined = answers.join(", ");
        let _ = ctx.repository.persist_dns_last_result(&monitor.id, &joined).await;

        Ok(ProbeOutcome::up(format!("{} record(s): {joined}", record_type_name(config.record_type))).with_ping(ping_ms))
    }
}

fn record_type_name(rt: DnsRecordType) -> &'static str {
    match rt {
        DnsRecordType::A => "A",
        DnsRecordType::Aaaa => "AAAA",
        DnsRecordType::Cname => "CNAME",
        DnsRecordType::Caa => "CAA",
        DnsRecordType::Mx => "MX",
        DnsRecordType::Ns => "NS",
        DnsRecordType::Ptr => "PTR",
        DnsRecordType::Soa => "SOA",
        DnsRecordType::Srv => "SRV",
        DnsRecordType::Txt => "TXT",
    }
}
