pub mod incident;
pub mod incident_service;
pub mod service;
pub mod service_component;
pub mod service_group;

pub mod prelude {
    pub use super::incident::{Entity as IncidentEntity, Model as IncidentModel};

    pub use super::incident_service::{Entity as IncidentServiceEntity, Model as IncidentServiceModel};

    pub use super::service::{Entity as ServiceEntity, Model as ServiceModel};

    pub use super::service_component::{Entity as ServiceComponentEntity, Model as ServiceComponentModel};

    pub use super::service_group::{Entity as ServiceGroupEntity, Model as ServiceGroupModel};
}
