//! Contracts implemented by beans and collaborators of the factory.

pub mod aware;
pub mod dispose;
pub mod factory_bean;
pub mod resolver;

pub use aware::{BeanFactoryAware, BeanNameAware, TypeRegistryAware};
pub use dispose::{DisposableBean, InitializingBean};
pub use factory_bean::FactoryBean;
pub use resolver::AutowireCandidateResolver;
