//! Typed resource clients
//!
//! Each backend resource is a marker type implementing [`Resource`]; one
//! generic [`ResourceClient`] maps `list/get/create/update/delete` onto the
//! REST verbs for all of them.

use std::marker::PhantomData;

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::ApiClient;
use crate::error::{Error, Result};
use crate::models::{
    Class, ClassFilters, CreateClass, CreateEnrollment, CreateGrade, CreateRecommendation,
    CreateSubject, CreateUserProfile, Enrollment, EnrollmentFilters, Grade, GradeFilters,
    ListFilters, Page, Payload, Recommendation, RecommendationFilters, Subject, SubjectFilters,
    UpdateClass, UpdateEnrollment, UpdateGrade, UpdateRecommendation, UpdateSubject,
    UpdateUserProfile, UserFilters, UserProfile,
};

// ============================================================================
// Resource kinds
// ============================================================================

/// Backend-managed entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Subject,
    Class,
    Enrollment,
    Grade,
    Recommendation,
    User,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Subject,
        ResourceKind::Class,
        ResourceKind::Enrollment,
        ResourceKind::Grade,
        ResourceKind::Recommendation,
        ResourceKind::User,
    ];

    /// Collection path segment under `/api`
    pub fn path(&self) -> &'static str {
        match self {
            ResourceKind::Subject => "subjects",
            ResourceKind::Class => "classes",
            ResourceKind::Enrollment => "enrollments",
            ResourceKind::Grade => "grades",
            ResourceKind::Recommendation => "recommendations",
            ResourceKind::User => "users",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

// ============================================================================
// Resource trait and markers
// ============================================================================

/// Static description of one backend resource
pub trait Resource: Send + Sync + 'static {
    const KIND: ResourceKind;
    type Item: Payload + Clone;
    type Create: Serialize + Send + Sync;
    type Update: Serialize + Send + Sync;
    type Filters: ListFilters;
}

macro_rules! resource {
    ($marker:ident, $kind:ident, $item:ty, $create:ty, $update:ty, $filters:ty) => {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $marker;

        impl Resource for $marker {
            const KIND: ResourceKind = ResourceKind::$kind;
            type Item = $item;
            type Create = $create;
            type Update = $update;
            type Filters = $filters;
        }
    };
}

resource!(Subjects, Subject, Subject, CreateSubject, UpdateSubject, SubjectFilters);
resource!(Classes, Class, Class, CreateClass, UpdateClass, ClassFilters);
resource!(Enrollments, Enrollment, Enrollment, CreateEnrollment, UpdateEnrollment, EnrollmentFilters);
resource!(Grades, Grade, Grade, CreateGrade, UpdateGrade, GradeFilters);
resource!(
    Recommendations,
    Recommendation,
    Recommendation,
    CreateRecommendation,
    UpdateRecommendation,
    RecommendationFilters
);
resource!(Users, User, UserProfile, CreateUserProfile, UpdateUserProfile, UserFilters);

// ============================================================================
// ResourceClient
// ============================================================================

/// CRUD client for one resource, borrowed from an [`ApiClient`]
pub struct ResourceClient<'a, R: Resource> {
    api: &'a ApiClient,
    _resource: PhantomData<R>,
}

impl<'a, R: Resource> ResourceClient<'a, R> {
    pub(crate) fn new(api: &'a ApiClient) -> Self {
        Self {
            api,
            _resource: PhantomData,
        }
    }

    /// `GET /api/{resource}?filters`
    ///
    /// Filters are validated first; a missing required filter never reaches the network.
    pub async fn list(&self, filters: &R::Filters) -> Result<Page<R::Item>> {
        filters.validate()?;
        let url = self.api.endpoint(&[R::KIND.path()])?;
        self.api.get_json(url, Some(filters), None).await
    }

    /// `GET /api/{resource}/{id}`
    pub async fn get(&self, id: &str) -> Result<R::Item> {
        let url = self.api.endpoint(&[R::KIND.path(), require_id(id)?])?;
        self.api.get_json::<_, ()>(url, None, None).await
    }

    /// `POST /api/{resource}`
    pub async fn create(&self, dto: &R::Create) -> Result<R::Item> {
        let url = self.api.endpoint(&[R::KIND.path()])?;
        let item = self.api.send_json(Method::POST, url, dto, None).await?;
        log::info!("[api] Created {}", R::KIND);
        Ok(item)
    }

    /// `PUT /api/{resource}/{id}`
    pub async fn update(&self, id: &str, dto: &R::Update) -> Result<R::Item> {
        let url = self.api.endpoint(&[R::KIND.path(), require_id(id)?])?;
        let item = self.api.send_json(Method::PUT, url, dto, None).await?;
        log::info!("[api] Updated {} {}", R::KIND, id);
        Ok(item)
    }

    /// `DELETE /api/{resource}/{id}`
    pub async fn delete(&self, id: &str) -> Result<()> {
        let url = self.api.endpoint(&[R::KIND.path(), require_id(id)?])?;
        let builder = self.api.request(Method::DELETE, url, None);
        self.api.execute::<()>(builder).await?;
        log::info!("[api] Deleted {} {}", R::KIND, id);
        Ok(())
    }
}

// ============================================================================
// ResourceApi
// ============================================================================

/// CRUD surface the query layer reads and writes through
///
/// [`ApiClient`] is the HTTP implementation; tests plug in an in-memory backend.
#[async_trait]
pub trait ResourceApi: Send + Sync {
    async fn list<R: Resource>(&self, filters: &R::Filters) -> Result<Page<R::Item>>;
    async fn get<R: Resource>(&self, id: &str) -> Result<R::Item>;
    async fn create<R: Resource>(&self, dto: &R::Create) -> Result<R::Item>;
    async fn update<R: Resource>(&self, id: &str, dto: &R::Update) -> Result<R::Item>;
    async fn delete<R: Resource>(&self, id: &str) -> Result<()>;
}

#[async_trait]
impl ResourceApi for ApiClient {
    async fn list<R: Resource>(&self, filters: &R::Filters) -> Result<Page<R::Item>> {
        self.resource::<R>().list(filters).await
    }

    async fn get<R: Resource>(&self, id: &str) -> Result<R::Item> {
        self.resource::<R>().get(id).await
    }

    async fn create<R: Resource>(&self, dto: &R::Create) -> Result<R::Item> {
        self.resource::<R>().create(dto).await
    }

    async fn update<R: Resource>(&self, id: &str, dto: &R::Update) -> Result<R::Item> {
        self.resource::<R>().update(id, dto).await
    }

    async fn delete<R: Resource>(&self, id: &str) -> Result<()> {
        self.resource::<R>().delete(id).await
    }
}

fn require_id(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(Error::validation("An id is required"));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;

    fn offline_client() -> ApiClient {
        // Port 9 (discard) is never contacted by these tests
        let config = ClientConfig {
            api_base_url: "http://127.0.0.1:9".to_string(),
            auth_base_url: "http://127.0.0.1:9/auth/v1".to_string(),
            auth_api_key: None,
            timeout_secs: 1,
            session_path: std::path::PathBuf::from("/tmp/unused.json"),
        };
        ApiClient::new(&config).unwrap()
    }

    #[test]
    fn test_resource_paths() {
        assert_eq!(Subjects::KIND.path(), "subjects");
        assert_eq!(Enrollments::KIND.path(), "enrollments");
        assert_eq!(Users::KIND.to_string(), "users");
        assert_eq!(ResourceKind::ALL.len(), 6);
    }

    #[tokio::test]
    async fn test_list_without_required_filter_fails_locally() {
        let api = offline_client();
        let err = api
            .resource::<Enrollments>()
            .list(&EnrollmentFilters::default())
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let err = api
            .resource::<Recommendations>()
            .list(&RecommendationFilters::default())
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_blank_id_fails_locally() {
        let api = offline_client();
        let err = api.resource::<Grades>().delete("  ").await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_transport_error_is_failure() {
        let api = offline_client();
        let result = api.resource::<Subjects>().get("s-1").await;
        assert!(matches!(result, Err(Error::Http(_))));
    }
}
