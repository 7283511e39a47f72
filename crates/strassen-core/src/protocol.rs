//! The generic run-role procedure.
//!
//! Every participant runs [`run_role`] with its own [`Role`] and channel
//! endpoint. The procedure walks the role's entry in the
//! [role table](crate::roles) through five phases:
//!
//! 1. obtain input quadrants (coordinator: decompose and fan out; workers:
//!    receive from the coordinator);
//! 2. compute the role's product;
//! 3. relay the product to the roles that assemble with it;
//! 4. receive peer products and assemble the role's result quadrant;
//! 5. forward the quadrant to the coordinator, or (coordinator) gather the
//!    other three and stitch C.
//!
//! All traffic goes through a [`RoleChannel`], which checks every send and
//! receive against the link schedules derived from the table and fails
//! immediately on an out-of-order post instead of deadlocking.

use std::collections::BTreeMap;

use strassen_compute::{Channel, ChannelError, ComputeBackend};

use crate::assembly::{assemble, stitch_result};
use crate::decompose::{operand_quadrants, validate_inputs};
use crate::error::StrassenError;
use crate::product::compute_product;
use crate::roles::{self, link_schedule};
use crate::types::{Element, Matrix, ProductMap, QuadrantMap, Role, Tag};

/// A role's view of the transport, checked against the role table.
pub struct RoleChannel<C> {
    role: Role,
    inner: C,
    /// Scheduled tags per peer, outbound and inbound.
    outbound: Vec<Vec<Tag>>,
    inbound: Vec<Vec<Tag>>,
    sent: Vec<usize>,
    received: Vec<usize>,
}

impl<C> RoleChannel<C> {
    /// Wrap `inner`, whose rank must be `role`'s rank.
    pub fn new<T>(role: Role, inner: C) -> Result<Self, StrassenError>
    where
        T: Element,
        C: Channel<Tag, Matrix<T>>,
    {
        if inner.rank() != role.rank() {
            return Err(StrassenError::ProtocolViolation {
                role,
                detail: format!(
                    "endpoint has rank {}, role needs rank {}",
                    inner.rank(),
                    role.rank()
                ),
            });
        }
        Ok(Self {
            role,
            inner,
            outbound: Role::ALL.iter().map(|&peer| link_schedule(role, peer)).collect(),
            inbound: Role::ALL.iter().map(|&peer| link_schedule(peer, role)).collect(),
            sent: vec![0; Role::COUNT],
            received: vec![0; Role::COUNT],
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Send `payload` tagged `tag` to `to`.
    pub fn send<T>(&mut self, to: Role, tag: Tag, payload: Matrix<T>) -> Result<(), StrassenError>
    where
        T: Element,
        C: Channel<Tag, Matrix<T>>,
    {
        let peer = to.rank();
        let expected = self.outbound[peer].get(self.sent[peer]).copied();
        if expected != Some(tag) {
            return Err(StrassenError::out_of_order(self.role, "send", to, expected, tag));
        }

        log::debug!("{} -> {}: {}", self.role, to, tag);
        self.inner
            .send(peer, tag, payload)
            .map_err(|source| self.channel_error(source))?;
        self.sent[peer] += 1;
        Ok(())
    }

    /// Block until `tag` arrives from `from`.
    pub fn recv<T>(&mut self, from: Role, tag: Tag) -> Result<Matrix<T>, StrassenError>
    where
        T: Element,
        C: Channel<Tag, Matrix<T>>,
    {
        let peer = from.rank();
        let expected = self.inbound[peer].get(self.received[peer]).copied();
        if expected != Some(tag) {
            return Err(StrassenError::out_of_order(self.role, "receive", from, expected, tag));
        }

        let payload = self
            .inner
            .recv(peer, tag)
            .map_err(|source| self.channel_error(source))?;
        self.received[peer] += 1;
        log::debug!("{} <- {}: {}", self.role, from, tag);
        Ok(payload)
    }

    /// Check that every scheduled message was sent and received.
    pub fn finish(self) -> Result<(), StrassenError> {
        for peer in Role::ALL {
            let i = peer.rank();
            let unsent = self.outbound[i].len() - self.sent[i];
            let unreceived = self.inbound[i].len() - self.received[i];
            if unsent > 0 || unreceived > 0 {
                return Err(StrassenError::ProtocolViolation {
                    role: self.role,
                    detail: format!(
                        "finished with {unsent} unsent and {unreceived} unreceived \
                         messages on link with {peer}"
                    ),
                });
            }
        }
        Ok(())
    }

    fn channel_error(&self, source: ChannelError) -> StrassenError {
        match source {
            ChannelError::UnexpectedKey { .. } => StrassenError::ProtocolViolation {
                role: self.role,
                detail: source.to_string(),
            },
            source => StrassenError::Channel {
                role: self.role,
                source,
            },
        }
    }
}

/// Run one role to completion.
///
/// The coordinator must be given the operands and returns `Some(C)`;
/// workers are given `None` and return `None`.
pub fn run_role<T, C, B>(
    role: Role,
    channel: C,
    backend: &B,
    operands: Option<(&Matrix<T>, &Matrix<T>)>,
) -> Result<Option<Matrix<T>>, StrassenError>
where
    T: Element,
    C: Channel<Tag, Matrix<T>>,
    B: ComputeBackend<T> + ?Sized,
{
    let spec = roles::spec(role);
    let mut channel = RoleChannel::new::<T>(role, channel)?;

    // Phase 1: inputs.
    let inputs: QuadrantMap<T> = if role.is_coordinator() {
        let (a, b) = operands.ok_or_else(|| StrassenError::MissingOperand {
            role,
            name: "A, B".into(),
        })?;
        let sub_size = validate_inputs(a, b)?;
        log::info!("{}: decomposing {n}x{n} operands", role, n = 2 * sub_size);
        let mut quadrants = operand_quadrants(a, b)?;

        for worker in Role::WORKERS {
            for name in roles::spec(worker).inputs() {
                let quadrant = quadrants
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| StrassenError::MissingOperand {
                        role,
                        name: name.to_string(),
                    })?;
                channel.send(worker, Tag::Quadrant(name), quadrant)?;
            }
        }

        let own = spec.inputs();
        quadrants.retain(|name, _| own.contains(name));
        quadrants
    } else {
        let mut quadrants = QuadrantMap::new();
        for name in spec.inputs() {
            let quadrant = channel.recv(Role::Coordinator, Tag::Quadrant(name))?;
            quadrants.insert(name, quadrant);
        }
        quadrants
    };

    // Phase 2: the role's single product.
    let product = compute_product(role, spec.computes, &inputs, backend)?;
    drop(inputs);

    // Phase 3: relay.
    for &dest in spec.relays_to {
        channel.send(dest, Tag::Product(spec.computes), product.clone())?;
    }

    // Phase 4: peer products and assembly.
    let mut products = ProductMap::new();
    products.insert(spec.computes, product);
    for &(peer_product, from) in spec.receives {
        let received = channel.recv(from, Tag::Product(peer_product))?;
        products.insert(peer_product, received);
    }

    let mut results = BTreeMap::new();
    if let Some(quadrant) = spec.assembles {
        let assembled = assemble(role, quadrant, &products)?;
        if role.is_coordinator() {
            results.insert(quadrant, assembled);
        } else {
            channel.send(Role::Coordinator, Tag::Result(quadrant), assembled)?;
        }
    }
    drop(products);

    // Phase 5: gather and stitch.
    for &(quadrant, from) in spec.gathers {
        let received = channel.recv(from, Tag::Result(quadrant))?;
        results.insert(quadrant, received);
    }
    channel.finish()?;

    if role.is_coordinator() {
        let c = stitch_result(role, &results)?;
        log::info!("{}: stitched {}x{} result", role, c.nrows(), c.ncols());
        Ok(Some(c))
    } else {
        log::debug!("{}: done", role);
        Ok(None)
    }
}

/// Run the coordinator role and return C.
pub fn run_coordinator<T, C, B>(
    a: &Matrix<T>,
    b: &Matrix<T>,
    channel: C,
    backend: &B,
) -> Result<Matrix<T>, StrassenError>
where
    T: Element,
    C: Channel<Tag, Matrix<T>>,
    B: ComputeBackend<T> + ?Sized,
{
    run_role(Role::Coordinator, channel, backend, Some((a, b)))?.ok_or_else(|| {
        StrassenError::MissingOperand {
            role: Role::Coordinator,
            name: "C".into(),
        }
    })
}

/// Run a worker role.
pub fn run_worker<T, C, B>(role: Role, channel: C, backend: &B) -> Result<(), StrassenError>
where
    T: Element,
    C: Channel<Tag, Matrix<T>>,
    B: ComputeBackend<T> + ?Sized,
{
    if role.is_coordinator() {
        return Err(StrassenError::ProtocolViolation {
            role,
            detail: "coordinator cannot run as a worker".into(),
        });
    }
    run_role::<T, C, B>(role, channel, backend, None).map(|_| ())
}
