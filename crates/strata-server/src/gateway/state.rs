use std::sync::Arc;

use strata::cache::{DistributedStore, TieredCache};
use strata::config::Environment;
use strata::customers::{CustomerRepository, CustomerService};

pub struct HandlerState<R, D>
where
    R: CustomerRepository + 'static,
    D: DistributedStore + 'static,
{
    pub customers: CustomerService<R, D>,

    pub environment: Environment,
}

impl<R, D> Clone for HandlerState<R, D>
where
    R: CustomerRepository + 'static,
    D: DistributedStore + 'static,
{
    fn clone(&self) -> Self {
        Self {
            customers: self.customers.clone(),
            environment: self.environment,
        }
    }
}

impl<R, D> HandlerState<R, D>
where
    R: CustomerRepository + 'static,
    D: DistributedStore + 'static,
{
    pub fn new(repository: Arc<R>, cache: Arc<TieredCache<D>>, environment: Environment) -> Self {
        Self {
            customers: CustomerService::new(repository, cache),
            environment,
        }
    }

    pub fn cache(&self) -> &Arc<TieredCache<D>> {
        self.customers.cache()
    }
}
