//! 内置发现引擎描述；配置中同名条目覆盖，新名字扩展

use crate::tools::command::DiscoveryTool;
use crate::tools::parser::ParserKind;

pub fn builtin_tools() -> Vec<DiscoveryTool> {
    vec![
        DiscoveryTool::new("amass", "amass", &["enum", "-passive", "-d", "{{target}}"])
            .with_description("OWASP Amass passive enumeration"),
        DiscoveryTool::new("subfinder", "subfinder", &["-d", "{{target}}", "-silent"])
            .with_description("ProjectDiscovery subfinder passive sources"),
        DiscoveryTool::new(
            "dnsenum",
            "dnsenum",
            &["--noreverse", "--dnsserver", "1.1.1.1", "--timeout", "20", "{{target}}"],
        )
        .with_parser(ParserKind::Dnsenum)
        .with_timeout(60)
        .with_description("dnsenum zone walk and brute force"),
        DiscoveryTool::new("sublist3r", "sublist3r", &["-d", "{{target}}", "-o", "/dev/stdout"])
            .with_description("Sublist3r search-engine enumeration"),
    ]
}

/// 内置列表与配置条目合并：按名字覆盖，保持内置在前
pub fn merge_tools(configured: &[DiscoveryTool]) -> Vec<DiscoveryTool> {
    let mut tools = builtin_tools();
    for entry in configured {
        match tools.iter_mut().find(|t| t.name == entry.name) {
            Some(existing) => *existing = entry.clone(),
            None => tools.push(entry.clone()),
        }
    }
    tools
}
