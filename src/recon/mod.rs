//! 侦察编排与聚合核心：目标、数据模型、聚合、验证、递归、IP 种子与映射、会话与报告

pub mod aggregator;
pub mod ip_mapper;
pub mod ip_seed;
pub mod model;
pub mod recursion;
pub mod report;
pub mod session;
pub mod target;
pub mod validator;

pub use aggregator::{MergeOutcome, MergeStats, ResultAggregator, SubdomainMap};
pub use ip_mapper::{build_ip_map, by_host_count, IpMap};
pub use ip_seed::{CertificateError, CertificateSource, TlsCertificateSource, TLS_CERT_SOURCE, VHOST_SOURCE};
pub use model::{IpRecord, RawFinding, ResolutionStatus, SubdomainRecord, ToolRunReport, ToolStatus};
pub use recursion::RecursionController;
pub use report::{ReconReport, RunCompletion};
pub use session::{ReconSession, SessionOptions, REVERSE_DNS_TOOL, SEED_SOURCES};
pub use target::{normalize_hostname, ScopeMode, ScopeRule, Target};
pub use validator::{DnsValidator, ValidationFailure, ValidationSummary};
