//! The static role table: who computes what, who relays to whom, and who
//! assembles each result quadrant.
//!
//! | Role | Computes | Relays product to | Receives | Assembles |
//! |------|----------|-------------------|----------|-----------|
//! | coordinator | m3 | worker5 | m5 ← worker4; C11, C21, C22 | C12 |
//! | worker1 | m2 | worker5, worker3 | quadrants | |
//! | worker2 | m1 | worker5 | quadrants; m4, m5, m7 | C11 |
//! | worker3 | m4 | worker2 | quadrants; m2 | C21 |
//! | worker4 | m5 | coordinator, worker2 | quadrants | |
//! | worker5 | m6 | | quadrants; m3, m1, m2 | C22 |
//! | worker6 | m7 | worker2 | quadrants | |
//!
//! Workers receive exactly the quadrants their product reads; the
//! coordinator holds A and B and uses its own quadrants locally. Message
//! schedules are derived from this table, and the run-role procedure in
//! [`crate::protocol`] walks the same table, so the two cannot drift apart.

use serde::Serialize;

use crate::types::{Product, QuadrantName, ResultQuadrant, Role, Tag};

/// Static duties of one role.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RoleSpec {
    pub role: Role,
    /// The single product this role computes.
    pub computes: Product,
    /// Roles that receive a copy of this role's product, in send order.
    pub relays_to: &'static [Role],
    /// Peer products this role receives, in receive order.
    pub receives: &'static [(Product, Role)],
    /// Result quadrant this role assembles, if any.
    pub assembles: Option<ResultQuadrant>,
    /// Result quadrants gathered from assemblers (coordinator only).
    pub gathers: &'static [(ResultQuadrant, Role)],
}

impl RoleSpec {
    /// Quadrants this role needs, in fan-out order.
    pub fn inputs(&self) -> Vec<QuadrantName> {
        self.computes.inputs()
    }
}

pub static ROLE_TABLE: [RoleSpec; Role::COUNT] = [
    RoleSpec {
        role: Role::Coordinator,
        computes: Product::M3,
        relays_to: &[Role::Worker5],
        receives: &[(Product::M5, Role::Worker4)],
        assembles: Some(ResultQuadrant::C12),
        gathers: &[
            (ResultQuadrant::C11, Role::Worker2),
            (ResultQuadrant::C21, Role::Worker3),
            (ResultQuadrant::C22, Role::Worker5),
        ],
    },
    RoleSpec {
        role: Role::Worker1,
        computes: Product::M2,
        relays_to: &[Role::Worker5, Role::Worker3],
        receives: &[],
        assembles: None,
        gathers: &[],
    },
    RoleSpec {
        role: Role::Worker2,
        computes: Product::M1,
        relays_to: &[Role::Worker5],
        receives: &[
            (Product::M4, Role::Worker3),
            (Product::M5, Role::Worker4),
            (Product::M7, Role::Worker6),
        ],
        assembles: Some(ResultQuadrant::C11),
        gathers: &[],
    },
    RoleSpec {
        role: Role::Worker3,
        computes: Product::M4,
        relays_to: &[Role::Worker2],
        receives: &[(Product::M2, Role::Worker1)],
        assembles: Some(ResultQuadrant::C21),
        gathers: &[],
    },
    RoleSpec {
        role: Role::Worker4,
        computes: Product::M5,
        relays_to: &[Role::Coordinator, Role::Worker2],
        receives: &[],
        assembles: None,
        gathers: &[],
    },
    RoleSpec {
        role: Role::Worker5,
        computes: Product::M6,
        relays_to: &[],
        receives: &[
            (Product::M3, Role::Coordinator),
            (Product::M1, Role::Worker2),
            (Product::M2, Role::Worker1),
        ],
        assembles: Some(ResultQuadrant::C22),
        gathers: &[],
    },
    RoleSpec {
        role: Role::Worker6,
        computes: Product::M7,
        relays_to: &[Role::Worker2],
        receives: &[],
        assembles: None,
        gathers: &[],
    },
];

/// Duties of `role`.
pub fn spec(role: Role) -> &'static RoleSpec {
    &ROLE_TABLE[role.rank()]
}

/// The role that computes `product`. Agrees with `computes` in [`ROLE_TABLE`].
pub fn owner_of(product: Product) -> Role {
    match product {
        Product::M1 => Role::Worker2,
        Product::M2 => Role::Worker1,
        Product::M3 => Role::Coordinator,
        Product::M4 => Role::Worker3,
        Product::M5 => Role::Worker4,
        Product::M6 => Role::Worker5,
        Product::M7 => Role::Worker6,
    }
}

/// The role that assembles `quadrant`. Agrees with `assembles` in [`ROLE_TABLE`].
pub fn assembler_of(quadrant: ResultQuadrant) -> Role {
    match quadrant {
        ResultQuadrant::C11 => Role::Worker2,
        ResultQuadrant::C12 => Role::Coordinator,
        ResultQuadrant::C21 => Role::Worker3,
        ResultQuadrant::C22 => Role::Worker5,
    }
}

/// One scheduled message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Message {
    pub sender: Role,
    pub receiver: Role,
    pub tag: Tag,
}

/// Messages `role` sends, in the order it sends them.
pub fn outbound(role: Role) -> Vec<Message> {
    let spec = spec(role);
    let mut out = Vec::new();
    let mut push = |receiver: Role, tag: Tag| {
        out.push(Message {
            sender: role,
            receiver,
            tag,
        })
    };

    if role.is_coordinator() {
        for worker in Role::WORKERS {
            for name in self::spec(worker).inputs() {
                push(worker, Tag::Quadrant(name));
            }
        }
    }
    for &dest in spec.relays_to {
        push(dest, Tag::Product(spec.computes));
    }
    if let Some(quadrant) = spec.assembles {
        if !role.is_coordinator() {
            push(Role::Coordinator, Tag::Result(quadrant));
        }
    }
    out
}

/// Messages `role` receives, in the order it posts the receives.
pub fn inbound(role: Role) -> Vec<Message> {
    let spec = spec(role);
    let mut out = Vec::new();

    if !role.is_coordinator() {
        for name in spec.inputs() {
            out.push(Message {
                sender: Role::Coordinator,
                receiver: role,
                tag: Tag::Quadrant(name),
            });
        }
    }
    for &(product, sender) in spec.receives {
        out.push(Message {
            sender,
            receiver: role,
            tag: Tag::Product(product),
        });
    }
    for &(quadrant, sender) in spec.gathers {
        out.push(Message {
            sender,
            receiver: role,
            tag: Tag::Result(quadrant),
        });
    }
    out
}

/// Every message of one invocation, grouped by sender in rank order.
pub fn schedule() -> Vec<Message> {
    Role::ALL.into_iter().flat_map(outbound).collect()
}

/// Tags carried on the link `sender → receiver`, in order.
pub fn link_schedule(sender: Role, receiver: Role) -> Vec<Tag> {
    outbound(sender)
        .into_iter()
        .filter(|m| m.receiver == receiver)
        .map(|m| m.tag)
        .collect()
}

/// Number of messages on the link `sender → receiver`.
pub fn link_load(sender: Role, receiver: Role) -> usize {
    outbound(sender)
        .iter()
        .filter(|m| m.receiver == receiver)
        .count()
}

/// Quadrant messages sent by the coordinator.
pub fn fan_out_count() -> usize {
    outbound(Role::Coordinator)
        .iter()
        .filter(|m| matches!(m.tag, Tag::Quadrant(_)))
        .count()
}

/// Messages sent per invocation.
pub fn message_count() -> usize {
    schedule().len()
}
