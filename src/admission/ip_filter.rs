use std::net::Ipv4Addr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpFilterMode {
    Whitelist,
    Blacklist,
}

#[derive(Debug, Clone)]
struct CidrBlock {
    network: u32,
    mask: u32,
}

impl CidrBlock {
    fn parse(cidr: &str) -> Option<Self> {
        let (addr, prefix_len) = match cidr.split_once('/') {
            Some((a, p)) => (a, p.parse::<u32>().ok()?),
            None => (cidr, 32),
        };
        let addr: Ipv4Addr = addr.parse().ok()?;
        if prefix_len > 32 {
            return None;
        }
        let mask = if prefix_len == 0 {
            0
        } else {
            u32::MAX << (32 - prefix_len)
        };
        Some(CidrBlock {
            network: u32::from(addr) & mask,
            mask,
        })
    }

    fn contains(&self, addr: Ipv4Addr) -> bool {
        (u32::from(addr) & self.mask) == self.network
    }
}

/// Compiles CIDR addresses to integer ranges once; allow/deny by set
/// membership. Unknown addresses in whitelist mode are denied.
pub struct IpFilter {
    mode: IpFilterMode,
    blocks: Vec<CidrBlock>,
}

impl IpFilter {
    pub fn build(mode: IpFilterMode, cidrs: &[String]) -> Self {
        let blocks = cidrs.iter().filter_map(|c| CidrBlock::parse(c)).collect();
        IpFilter { mode, blocks }
    }

    pub fn is_allowed(&self, addr: &str) -> bool {
        let Ok(parsed) = addr.parse::<Ipv4Addr>() else {
            return matches!(self.mode, IpFilterMode::Blacklist);
        };
        let in_set = self.blocks.iter().any(|b| b.contains(parsed));
        match self.mode {
            IpFilterMode::Whitelist => in_set,
            IpFilterMode::Blacklist => !in_set,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitelist_denies_unknown_address() {
        let filter = IpFilter::build(IpFilterMode::Whitelist, &["10.0.0.0/8".to_string()]);
        assert!(filter.is_allowed("10.1.2.3"));
        assert!(!filter.is_allowed("192.168.1.1"));
    }

    #[test]
    fn blacklist_denies_listed_address() {
        let filter = IpFilter::build(IpFilterMode::Blacklist, &["192.168.0.0/16".to_string()]);
        assert!(!filter.is_allowed("192.168.5.5"));
        assert!(filter.is_allowed("8.8.8.8"));
    }
}
