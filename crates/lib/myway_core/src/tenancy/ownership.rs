//! Resource → organization resolution.
//!
//! The ownership chain is fixed:
//!
//! ```text
//! Organization ← Course ← Module ← Material
//!                Course ← Assignment ← Submission
//!                Course ← Thread
//! ```
//!
//! Each step is one parent lookup. A missing link anywhere yields
//! [`TenancyError::NotFound`]; the org id carried by a request is never
//! consulted here.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use super::TenancyError;
use crate::repo::HierarchyRepository;

/// A tenant-scoped resource addressed by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceRef {
    Organization(Uuid),
    Course(Uuid),
    Module(Uuid),
    Material(Uuid),
    Assignment(Uuid),
    Submission(Uuid),
    Thread(Uuid),
}

impl ResourceRef {
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceRef::Organization(_) => "organization",
            ResourceRef::Course(_) => "course",
            ResourceRef::Module(_) => "module",
            ResourceRef::Material(_) => "material",
            ResourceRef::Assignment(_) => "assignment",
            ResourceRef::Submission(_) => "submission",
            ResourceRef::Thread(_) => "thread",
        }
    }

    pub fn id(&self) -> Uuid {
        match *self {
            ResourceRef::Organization(id)
            | ResourceRef::Course(id)
            | ResourceRef::Module(id)
            | ResourceRef::Material(id)
            | ResourceRef::Assignment(id)
            | ResourceRef::Submission(id)
            | ResourceRef::Thread(id) => id,
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

pub struct OwnershipResolver<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for OwnershipResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

fn link(parent: Option<Uuid>) -> Result<Uuid, TenancyError> {
    parent.ok_or(TenancyError::NotFound)
}

impl<S> OwnershipResolver<S>
where
    S: HierarchyRepository + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The organization that owns `resource`.
    pub async fn org_of(&self, resource: ResourceRef) -> Result<Uuid, TenancyError> {
        match resource {
            ResourceRef::Organization(id) => {
                if self.store.organization_exists(id).await? {
                    Ok(id)
                } else {
                    Err(TenancyError::NotFound)
                }
            }
            ResourceRef::Course(id) => self.course_org(id).await,
            ResourceRef::Module(id) => {
                let course = link(self.store.module_course(id).await?)?;
                self.course_org(course).await
            }
            ResourceRef::Material(id) => {
                let module = link(self.store.material_module(id).await?)?;
                let course = link(self.store.module_course(module).await?)?;
                self.course_org(course).await
            }
            ResourceRef::Assignment(id) => {
                let course = link(self.store.assignment_course(id).await?)?;
                self.course_org(course).await
            }
            ResourceRef::Submission(id) => {
                let assignment = link(self.store.submission_assignment(id).await?)?;
                let course = link(self.store.assignment_course(assignment).await?)?;
                self.course_org(course).await
            }
            ResourceRef::Thread(id) => {
                let course = link(self.store.thread_course(id).await?)?;
                self.course_org(course).await
            }
        }
    }

    async fn course_org(&self, course_id: Uuid) -> Result<Uuid, TenancyError> {
        link(self.store.course_org(course_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::models::course::{MaterialKind, NewAssignment, NewCourse, NewMaterial, NewModule};
    use crate::repo::CatalogRepository;
    use crate::repo::memory::MemoryStore;

    struct Tree {
        org: Uuid,
        course: Uuid,
        module: Uuid,
        material: Uuid,
        assignment: Uuid,
        submission: Uuid,
        thread: Uuid,
    }

    async fn seed(store: &MemoryStore) -> Tree {
        let owner = Uuid::new_v4();
        let (org, _) = store.create_organization("Org", owner).await.unwrap();
        let course = store
            .create_course(NewCourse {
                org_id: org.id,
                code: "CS101".into(),
                title: "Intro".into(),
                description: String::new(),
                created_by: owner,
            })
            .await
            .unwrap();
        let module = store
            .create_module(NewModule {
                course_id: course.id,
                title: "Week 1".into(),
                position: 1,
            })
            .await
            .unwrap();
        let material = store
            .create_material(NewMaterial {
                module_id: module.id,
                kind: MaterialKind::Text,
                title: "Notes".into(),
                source_url: None,
            })
            .await
            .unwrap();
        let assignment = store
            .create_assignment(NewAssignment {
                course_id: course.id,
                title: "HW1".into(),
                due_at: Utc::now() + Duration::days(3),
                points: 10,
                instructions: String::new(),
            })
            .await
            .unwrap();
        let (submission, _) = store
            .upsert_submission(assignment.id, Uuid::new_v4(), None, Utc::now())
            .await
            .unwrap();
        let thread = store
            .create_thread(course.id, owner, "Question", "How?")
            .await
            .unwrap();
        Tree {
            org: org.id,
            course: course.id,
            module: module.id,
            material: material.id,
            assignment: assignment.id,
            submission: submission.id,
            thread: thread.id,
        }
    }

    #[tokio::test]
    async fn every_resource_resolves_to_its_organization() {
        let store = Arc::new(MemoryStore::new());
        let tree = seed(&store).await;
        let resolver = OwnershipResolver::new(store);

        for resource in [
            ResourceRef::Organization(tree.org),
            ResourceRef::Course(tree.course),
            ResourceRef::Module(tree.module),
            ResourceRef::Material(tree.material),
            ResourceRef::Assignment(tree.assignment),
            ResourceRef::Submission(tree.submission),
            ResourceRef::Thread(tree.thread),
        ] {
            assert_eq!(resolver.org_of(resource).await.unwrap(), tree.org, "{resource}");
        }
    }

    #[tokio::test]
    async fn resources_in_different_orgs_resolve_apart() {
        let store = Arc::new(MemoryStore::new());
        let a = seed(&store).await;
        let b = seed(&store).await;
        let resolver = OwnershipResolver::new(store);

        assert_eq!(resolver.org_of(ResourceRef::Material(a.material)).await.unwrap(), a.org);
        assert_eq!(resolver.org_of(ResourceRef::Material(b.material)).await.unwrap(), b.org);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let resolver = OwnershipResolver::new(Arc::new(MemoryStore::new()));
        for resource in [
            ResourceRef::Organization(Uuid::new_v4()),
            ResourceRef::Course(Uuid::new_v4()),
            ResourceRef::Material(Uuid::new_v4()),
            ResourceRef::Submission(Uuid::new_v4()),
            ResourceRef::Thread(Uuid::new_v4()),
        ] {
            assert!(matches!(
                resolver.org_of(resource).await,
                Err(TenancyError::NotFound)
            ));
        }
    }

    #[tokio::test]
    async fn broken_chain_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        // module whose course was never created
        let orphan = store
            .create_module(NewModule {
                course_id: Uuid::new_v4(),
                title: "Orphan".into(),
                position: 1,
            })
            .await
            .unwrap();
        let resolver = OwnershipResolver::new(store);
        assert!(matches!(
            resolver.org_of(ResourceRef::Module(orphan.id)).await,
            Err(TenancyError::NotFound)
        ));
    }

    #[test]
    fn display_names_kind_and_id() {
        let id = Uuid::nil();
        assert_eq!(
            ResourceRef::Thread(id).to_string(),
            format!("thread:{id}")
        );
    }
}
