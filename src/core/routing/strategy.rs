//! Message group strategies
//!
//! Each strategy decides whether it applies to an [`InteractionContext`] and,
//! if so, derives the group id that orders delivery on the downstream FIFO
//! queue. Strategies are stateless; the chain order lives in
//! [`GroupKeyStrategy::DEFAULT_CHAIN`].

use crate::domain::interaction::{DELIVERY_TYPE, FACILITY, MESSAGE_CODE};
use crate::domain::{
    InteractionContext, MessageSourceType, DEFAULT_MESSAGE_GROUP_ID, DEFAULT_TENANT_ID,
    UNKNOWN_MESSAGE_GROUP_ID,
};
use std::fmt;

/// Closed set of group-key strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKeyStrategy {
    /// MLLP interactions: ZNT delivery type, facility and message code
    Mllp,
    /// Raw TCP interactions: destination port
    Tcp,
    /// Any interaction carrying a real tenant id
    Tenant,
    /// Always applies: source ip, destination ip, destination port
    IpPortFallback,
}

impl GroupKeyStrategy {
    /// Evaluation order, highest priority first
    pub const DEFAULT_CHAIN: [GroupKeyStrategy; 4] = [
        GroupKeyStrategy::Mllp,
        GroupKeyStrategy::Tcp,
        GroupKeyStrategy::Tenant,
        GroupKeyStrategy::IpPortFallback,
    ];

    /// Whether this strategy can derive a group id for `ctx`
    pub fn supports(&self, ctx: &InteractionContext) -> bool {
        match self {
            Self::Mllp => ctx.source_type == MessageSourceType::Mllp,
            Self::Tcp => ctx.source_type == MessageSourceType::Tcp,
            Self::Tenant => ctx
                .tenant_id
                .as_deref()
                .map(str::trim)
                .is_some_and(|tenant| !tenant.is_empty() && tenant != DEFAULT_TENANT_ID),
            Self::IpPortFallback => true,
        }
    }

    /// Derives the group id; always non-empty
    pub fn create_group_id(&self, ctx: &InteractionContext) -> String {
        match self {
            Self::Mllp => {
                let parts = join_non_blank(&[
                    ctx.parameter(DELIVERY_TYPE),
                    ctx.parameter(FACILITY),
                    ctx.parameter(MESSAGE_CODE),
                ]);
                parts.unwrap_or_else(|| destination_port_or_default(ctx))
            }
            Self::Tcp => destination_port_or_default(ctx),
            Self::Tenant => ctx
                .tenant_id
                .as_deref()
                .map(str::trim)
                .unwrap_or(DEFAULT_TENANT_ID)
                .to_string(),
            Self::IpPortFallback => join_non_blank(&[
                ctx.source_ip.as_deref(),
                ctx.destination_ip.as_deref(),
                ctx.destination_port.as_deref(),
            ])
            .unwrap_or_else(|| UNKNOWN_MESSAGE_GROUP_ID.to_string()),
        }
    }

    /// Short name used in log lines
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mllp => "MllpMessageGroupStrategy",
            Self::Tcp => "TcpMessageGroupStrategy",
            Self::Tenant => "TenantMessageGroupStrategy",
            Self::IpPortFallback => "IpPortMessageGroupStrategy",
        }
    }
}

impl fmt::Display for GroupKeyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Joins the trimmed non-blank values with `_`; `None` if all are blank
fn join_non_blank(values: &[Option<&str>]) -> Option<String> {
    let parts: Vec<&str> = values
        .iter()
        .filter_map(|value| value.map(str::trim))
        .filter(|value| !value.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("_"))
    }
}

fn destination_port_or_default(ctx: &InteractionContext) -> String {
    ctx.destination_port
        .as_deref()
        .map(str::trim)
        .filter(|port| !port.is_empty())
        .unwrap_or(DEFAULT_MESSAGE_GROUP_ID)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mllp_ctx(params: &[(&str, &str)]) -> InteractionContext {
        let mut ctx = InteractionContext::new(MessageSourceType::Mllp);
        for (k, v) in params {
            ctx.additional_parameters.insert(k.to_string(), v.to_string());
        }
        ctx
    }

    #[test]
    fn test_mllp_joins_fields_in_order() {
        let ctx = mllp_ctx(&[
            (MESSAGE_CODE, "ADT"),
            (FACILITY, " ER "),
            (DELIVERY_TYPE, "INBOUND"),
        ]);
        assert_eq!(GroupKeyStrategy::Mllp.create_group_id(&ctx), "INBOUND_ER_ADT");
    }

    #[test]
    fn test_mllp_skips_blank_fields() {
        let ctx = mllp_ctx(&[(DELIVERY_TYPE, "  "), (FACILITY, "ER"), (MESSAGE_CODE, "")]);
        assert_eq!(GroupKeyStrategy::Mllp.create_group_id(&ctx), "ER");
    }

    #[test]
    fn test_mllp_falls_back_to_port_then_default() {
        let mut ctx = mllp_ctx(&[]);
        ctx.destination_port = Some("9090".to_string());
        assert_eq!(GroupKeyStrategy::Mllp.create_group_id(&ctx), "9090");

        ctx.destination_port = Some(" ".to_string());
        assert_eq!(
            GroupKeyStrategy::Mllp.create_group_id(&ctx),
            DEFAULT_MESSAGE_GROUP_ID
        );
    }

    #[test]
    fn test_tenant_support_excludes_sentinel() {
        let mut ctx = InteractionContext::new(MessageSourceType::Http);
        assert!(!GroupKeyStrategy::Tenant.supports(&ctx));

        ctx.tenant_id = Some(DEFAULT_TENANT_ID.to_string());
        assert!(!GroupKeyStrategy::Tenant.supports(&ctx));

        ctx.tenant_id = Some("   ".to_string());
        assert!(!GroupKeyStrategy::Tenant.supports(&ctx));

        ctx.tenant_id = Some(" tenantX ".to_string());
        assert!(GroupKeyStrategy::Tenant.supports(&ctx));
        assert_eq!(GroupKeyStrategy::Tenant.create_group_id(&ctx), "tenantX");
    }

    #[test]
    fn test_fallback_joins_present_addresses() {
        let mut ctx = InteractionContext::new(MessageSourceType::Http);
        ctx.source_ip = Some("192.168.1.1".to_string());
        ctx.destination_port = Some("8080".to_string());
        assert_eq!(
            GroupKeyStrategy::IpPortFallback.create_group_id(&ctx),
            "192.168.1.1_8080"
        );
    }

    #[test]
    fn test_fallback_unknown_sentinel() {
        let mut ctx = InteractionContext::new(MessageSourceType::Soap);
        ctx.source_ip = Some("   ".to_string());
        assert!(GroupKeyStrategy::IpPortFallback.supports(&ctx));
        assert_eq!(
            GroupKeyStrategy::IpPortFallback.create_group_id(&ctx),
            UNKNOWN_MESSAGE_GROUP_ID
        );
    }
}
