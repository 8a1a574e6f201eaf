use std::any::Any;
use std::error::Error as StdError;
use std::marker::PhantomData;

use crate::error::StageFailure;

/// Type-erased value flowing between graph nodes
pub type Payload = Box<dyn Any + Send + Sync>;

pub enum Args<'a> {
    One(&'a Payload),
    Two(&'a Payload, &'a Payload),
}

/// Why a stage produced no value
pub enum Fault {
    Mismatch,
    Failed(StageFailure),
}

pub trait Stage: Send + Sync {
    fn eval(&self, args: Args<'_>) -> Result<Payload, Fault>;
}

fn boxed<B: Any + Send + Sync, E: StdError + Send + Sync + 'static>(
    out: Result<B, E>,
) -> Result<Payload, Fault> {
    match out {
        Ok(b) => Ok(Box::new(b)),
        Err(e) => Err(Fault::Failed(Box::new(e))),
    }
}

pub struct Unary<A, B, E, F>(F, PhantomData<fn(&A) -> Result<B, E>>);

impl<A, B, E, F: Fn(&A) -> Result<B, E>> Unary<A, B, E, F> {
    pub fn new(f: F) -> Self {
        Unary(f, PhantomData)
    }
}

impl<A, B, E, F> Stage for Unary<A, B, E, F>
where
    A: Any + Send + Sync,
    B: Any + Send + Sync,
    E: StdError + Send + Sync + 'static,
    F: Send + Sync + Fn(&A) -> Result<B, E>,
{
    fn eval(&self, args: Args<'_>) -> Result<Payload, Fault> {
        match args {
            Args::One(a) => match a.downcast_ref::<A>() {
                Some(a) => boxed(self.0(a)),
                None => Err(Fault::Mismatch),
            },
            Args::Two(..) => Err(Fault::Mismatch),
        }
    }
}

pub struct Binary<A, B, C, E, F>(F, PhantomData<fn(&A, &B) -> Result<C, E>>);

impl<A, B, C, E, F: Fn(&A, &B) -> Result<C, E>> Binary<A, B, C, E, F> {
    pub fn new(f: F) -> Self {
        Binary(f, PhantomData)
    }
}

impl<A, B, C, E, F> Stage for Binary<A, B, C, E, F>
where
    A: Any + Send + Sync,
    B: Any + Send + Sync,
    C: Any + Send + Sync,
    E: StdError + Send + Sync + 'static,
    F: Send + Sync + Fn(&A, &B) -> Result<C, E>,
{
    fn eval(&self, args: Args<'_>) -> Result<Payload, Fault> {
        match args {
            Args::Two(a, b) => match (a.downcast_ref::<A>(), b.downcast_ref::<B>()) {
                (Some(a), Some(b)) => boxed(self.0(a, b)),
                _ => Err(Fault::Mismatch),
            },
            Args::One(_) => Err(Fault::Mismatch),
        }
    }
}
