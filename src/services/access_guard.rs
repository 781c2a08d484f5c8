//! Ownership / visibility predicate wrapped around every metadata operation.
//!
//! Both checks are pure and fail closed: a missing identity or a missing
//! image always yields `false`.

use super::error::{Access, ServiceError, ServiceResult};
use crate::models::{
    identity::Identity,
    image::{Image, Visibility},
};
use tracing::debug;

pub struct AccessGuard;

impl AccessGuard {
    /// Public images are readable by anyone; private ones by their owner only.
    pub fn can_read(identity: Option<&Identity>, image: Option<&Image>) -> bool {
        let Some(image) = image else {
            return false;
        };
        image.visibility == Visibility::Public || Self::is_owner(identity, image)
    }

    /// Only the owner may write, regardless of visibility.
    pub fn can_write(identity: Option<&Identity>, image: Option<&Image>) -> bool {
        image.is_some_and(|image| Self::is_owner(identity, image))
    }

    fn is_owner(identity: Option<&Identity>, image: &Image) -> bool {
        identity.is_some_and(|who| who.id == image.owner_id)
    }

    /// Resolve a lookup result into the image, or the matching error kind.
    ///
    /// A missing image is `ImageNotFound`; an existing image the caller may
    /// not access is `NotAuthorized`.
    pub fn ensure(
        identity: Option<&Identity>,
        image: Option<Image>,
        id: uuid::Uuid,
        access: Access,
    ) -> ServiceResult<Image> {
        let Some(image) = image else {
            return Err(ServiceError::ImageNotFound(id));
        };
        let allowed = match access {
            Access::Read => Self::can_read(identity, Some(&image)),
            Access::Write => Self::can_write(identity, Some(&image)),
        };
        if !allowed {
            debug!(
                "denied {} access to image {} for {}",
                access,
                image.id,
                identity.map(|i| i.id.as_str()).unwrap_or("anonymous")
            );
            return Err(ServiceError::NotAuthorized(access));
        }
        Ok(image)
    }
}
