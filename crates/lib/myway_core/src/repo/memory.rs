//! In-process store.
//!
//! Backs the unit and router tests, and local runs without PostgreSQL. Holds
//! every table behind a single `RwLock`, which also makes multi-row writes
//! (organization + owner membership) atomic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    CatalogRepository, CredentialStore, HierarchyRepository, MembershipRepository,
    PrincipalRepository, Result, StorageError, token_digest,
};
use crate::models::auth::{NewPrincipal, Principal, PrincipalWithPassword, RefreshCredential, Role};
use crate::models::course::{
    Assignment, AssignmentStatus, Course, Material, Module, NewAssignment, NewCourse, NewMaterial,
    NewModule, Reply, Submission, SubmissionStatus, Thread,
};
use crate::models::tenancy::{
    DEFAULT_PLAN, MemberSummary, Membership, MembershipStatus, OrgMembership, Organization,
};

#[derive(Default)]
struct Tables {
    principals: HashMap<Uuid, PrincipalWithPassword>,
    /// Keyed by token digest.
    credentials: HashMap<String, RefreshCredential>,
    organizations: HashMap<Uuid, Organization>,
    memberships: HashMap<Uuid, Membership>,
    courses: HashMap<Uuid, Course>,
    modules: HashMap<Uuid, Module>,
    materials: HashMap<Uuid, Material>,
    assignments: HashMap<Uuid, Assignment>,
    submissions: HashMap<Uuid, Submission>,
    threads: HashMap<Uuid, Thread>,
    replies: HashMap<Uuid, Reply>,
}

impl Tables {
    fn membership_for(&self, principal_id: Uuid, org_id: Uuid) -> Option<&Membership> {
        self.memberships
            .values()
            .find(|m| m.principal_id == principal_id && m.org_id == org_id)
    }
}

/// In-memory implementation of every repository trait.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_credential_saves: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `CredentialStore::save` calls fail with
    /// `StorageError::Unavailable` (to exercise issuance failure paths).
    pub fn fail_credential_saves(&self, fail: bool) {
        self.fail_credential_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of stored refresh credentials.
    pub async fn credential_count(&self) -> usize {
        self.tables.read().await.credentials.len()
    }
}

#[async_trait]
impl PrincipalRepository for MemoryStore {
    async fn find_principal_by_email(&self, email: &str) -> Result<Option<PrincipalWithPassword>> {
        let tables = self.tables.read().await;
        Ok(tables
            .principals
            .values()
            .find(|p| p.principal.email == email)
            .cloned())
    }

    async fn find_principal(&self, id: Uuid) -> Result<Option<Principal>> {
        let tables = self.tables.read().await;
        Ok(tables.principals.get(&id).map(|p| p.principal.clone()))
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables.principals.values().any(|p| p.principal.email == email))
    }

    async fn create_principal(&self, new: NewPrincipal) -> Result<Principal> {
        let mut tables = self.tables.write().await;
        if tables.principals.values().any(|p| p.principal.email == new.email) {
            return Err(StorageError::Duplicate("principal email"));
        }
        let principal = Principal {
            id: Uuid::new_v4(),
            email: new.email,
            name: new.name,
            role: new.role,
            created_at: Utc::now(),
            last_login: None,
        };
        tables.principals.insert(
            principal.id,
            PrincipalWithPassword {
                principal: principal.clone(),
                password_hash: new.password_hash,
            },
        );
        Ok(principal)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut tables = self.tables.write().await;
        let row = tables
            .principals
            .get_mut(&id)
            .ok_or(StorageError::Missing("principal"))?;
        row.principal.last_login = Some(at);
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn save(
        &self,
        principal_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshCredential> {
        if self.fail_credential_saves.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("credential writes disabled".into()));
        }
        let mut tables = self.tables.write().await;
        let digest = token_digest(token);
        if tables.credentials.contains_key(&digest) {
            return Err(StorageError::Duplicate("refresh credential"));
        }
        let record = RefreshCredential {
            id: Uuid::now_v7(),
            principal_id,
            expires_at,
            created_at: Utc::now(),
        };
        tables.credentials.insert(digest, record.clone());
        Ok(record)
    }

    async fn find_valid(
        &self,
        token: &str,
        principal_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshCredential>> {
        let tables = self.tables.read().await;
        Ok(tables
            .credentials
            .get(&token_digest(token))
            .filter(|c| c.principal_id == principal_id && c.expires_at > now)
            .cloned())
    }

    async fn delete_by_value(&self, token: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.credentials.remove(&token_digest(token));
        Ok(())
    }

    async fn delete_all_for(&self, principal_id: Uuid) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.credentials.len();
        tables.credentials.retain(|_, c| c.principal_id != principal_id);
        Ok((before - tables.credentials.len()) as u64)
    }
}

#[async_trait]
impl MembershipRepository for MemoryStore {
    async fn find_membership(&self, principal_id: Uuid, org_id: Uuid) -> Result<Option<Membership>> {
        let tables = self.tables.read().await;
        Ok(tables.membership_for(principal_id, org_id).cloned())
    }

    async fn create_membership(
        &self,
        org_id: Uuid,
        principal_id: Uuid,
        role: Role,
        status: MembershipStatus,
    ) -> Result<Membership> {
        let mut tables = self.tables.write().await;
        if tables.membership_for(principal_id, org_id).is_some() {
            return Err(StorageError::Duplicate("membership"));
        }
        let membership = Membership {
            id: Uuid::new_v4(),
            org_id,
            principal_id,
            role,
            status,
        };
        tables.memberships.insert(membership.id, membership.clone());
        Ok(membership)
    }

    async fn update_membership(
        &self,
        id: Uuid,
        role: Role,
        status: MembershipStatus,
    ) -> Result<Membership> {
        let mut tables = self.tables.write().await;
        let row = tables
            .memberships
            .get_mut(&id)
            .ok_or(StorageError::Missing("membership"))?;
        row.role = role;
        row.status = status;
        Ok(row.clone())
    }

    async fn list_memberships(&self, principal_id: Uuid) -> Result<Vec<OrgMembership>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<OrgMembership> = tables
            .memberships
            .values()
            .filter(|m| m.principal_id == principal_id)
            .filter_map(|m| {
                tables.organizations.get(&m.org_id).map(|org| OrgMembership {
                    organization: org.clone(),
                    membership: m.clone(),
                })
            })
            .collect();
        rows.sort_by(|a, b| a.organization.name.cmp(&b.organization.name));
        Ok(rows)
    }

    async fn list_members(&self, org_id: Uuid) -> Result<Vec<MemberSummary>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<MemberSummary> = tables
            .memberships
            .values()
            .filter(|m| m.org_id == org_id)
            .filter_map(|m| {
                tables.principals.get(&m.principal_id).map(|p| MemberSummary {
                    principal_id: m.principal_id,
                    email: p.principal.email.clone(),
                    name: p.principal.name.clone(),
                    role: m.role,
                    status: m.status,
                })
            })
            .collect();
        rows.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(rows)
    }
}

#[async_trait]
impl HierarchyRepository for MemoryStore {
    async fn organization_exists(&self, org_id: Uuid) -> Result<bool> {
        Ok(self.tables.read().await.organizations.contains_key(&org_id))
    }

    async fn course_org(&self, course_id: Uuid) -> Result<Option<Uuid>> {
        Ok(self.tables.read().await.courses.get(&course_id).map(|c| c.org_id))
    }

    async fn module_course(&self, module_id: Uuid) -> Result<Option<Uuid>> {
        Ok(self.tables.read().await.modules.get(&module_id).map(|m| m.course_id))
    }

    async fn material_module(&self, material_id: Uuid) -> Result<Option<Uuid>> {
        Ok(self
            .tables
            .read()
            .await
            .materials
            .get(&material_id)
            .map(|m| m.module_id))
    }

    async fn assignment_course(&self, assignment_id: Uuid) -> Result<Option<Uuid>> {
        Ok(self
            .tables
            .read()
            .await
            .assignments
            .get(&assignment_id)
            .map(|a| a.course_id))
    }

    async fn submission_assignment(&self, submission_id: Uuid) -> Result<Option<Uuid>> {
        Ok(self
            .tables
            .read()
            .await
            .submissions
            .get(&submission_id)
            .map(|s| s.assignment_id))
    }

    async fn thread_course(&self, thread_id: Uuid) -> Result<Option<Uuid>> {
        Ok(self.tables.read().await.threads.get(&thread_id).map(|t| t.course_id))
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn create_organization(&self, name: &str, owner: Uuid) -> Result<(Organization, Membership)> {
        let mut tables = self.tables.write().await;
        let org = Organization {
            id: Uuid::new_v4(),
            name: name.to_string(),
            plan: DEFAULT_PLAN.to_string(),
            created_at: Utc::now(),
        };
        let membership = Membership {
            id: Uuid::new_v4(),
            org_id: org.id,
            principal_id: owner,
            role: Role::Organizer,
            status: MembershipStatus::Active,
        };
        tables.organizations.insert(org.id, org.clone());
        tables.memberships.insert(membership.id, membership.clone());
        Ok((org, membership))
    }

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>> {
        Ok(self.tables.read().await.organizations.get(&id).cloned())
    }

    async fn create_course(&self, new: NewCourse) -> Result<Course> {
        let course = Course {
            id: Uuid::new_v4(),
            org_id: new.org_id,
            code: new.code,
            title: new.title,
            description: new.description,
            created_by: new.created_by,
        };
        self.tables
            .write()
            .await
            .courses
            .insert(course.id, course.clone());
        Ok(course)
    }

    async fn find_course(&self, id: Uuid) -> Result<Option<Course>> {
        Ok(self.tables.read().await.courses.get(&id).cloned())
    }

    async fn list_courses(&self, org_id: Uuid) -> Result<Vec<Course>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Course> = tables
            .courses
            .values()
            .filter(|c| c.org_id == org_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(rows)
    }

    async fn create_module(&self, new: NewModule) -> Result<Module> {
        let module = Module {
            id: Uuid::new_v4(),
            course_id: new.course_id,
            title: new.title,
            position: new.position,
        };
        self.tables
            .write()
            .await
            .modules
            .insert(module.id, module.clone());
        Ok(module)
    }

    async fn find_module(&self, id: Uuid) -> Result<Option<Module>> {
        Ok(self.tables.read().await.modules.get(&id).cloned())
    }

    async fn list_modules(&self, course_id: Uuid) -> Result<Vec<Module>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Module> = tables
            .modules
            .values()
            .filter(|m| m.course_id == course_id)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.position);
        Ok(rows)
    }

    async fn create_material(&self, new: NewMaterial) -> Result<Material> {
        let material = Material {
            id: Uuid::new_v4(),
            module_id: new.module_id,
            kind: new.kind,
            title: new.title,
            source_url: new.source_url,
        };
        self.tables
            .write()
            .await
            .materials
            .insert(material.id, material.clone());
        Ok(material)
    }

    async fn find_material(&self, id: Uuid) -> Result<Option<Material>> {
        Ok(self.tables.read().await.materials.get(&id).cloned())
    }

    async fn list_materials(&self, module_id: Uuid) -> Result<Vec<Material>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Material> = tables
            .materials
            .values()
            .filter(|m| m.module_id == module_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(rows)
    }

    async fn create_assignment(&self, new: NewAssignment) -> Result<Assignment> {
        let assignment = Assignment {
            id: Uuid::new_v4(),
            course_id: new.course_id,
            title: new.title,
            due_at: new.due_at,
            points: new.points,
            instructions: new.instructions,
            status: AssignmentStatus::Active,
        };
        self.tables
            .write()
            .await
            .assignments
            .insert(assignment.id, assignment.clone());
        Ok(assignment)
    }

    async fn find_assignment(&self, id: Uuid) -> Result<Option<Assignment>> {
        Ok(self.tables.read().await.assignments.get(&id).cloned())
    }

    async fn list_active_assignments(&self, course_id: Uuid) -> Result<Vec<Assignment>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Assignment> = tables
            .assignments
            .values()
            .filter(|a| a.course_id == course_id && a.status == AssignmentStatus::Active)
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.due_at);
        Ok(rows)
    }

    async fn upsert_submission(
        &self,
        assignment_id: Uuid,
        user_id: Uuid,
        file_url: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(Submission, bool)> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .submissions
            .values_mut()
            .find(|s| s.assignment_id == assignment_id && s.user_id == user_id)
        {
            existing.status = SubmissionStatus::Submitted;
            existing.submitted_at = at;
            if file_url.is_some() {
                existing.file_url = file_url;
            }
            return Ok((existing.clone(), false));
        }
        let submission = Submission {
            id: Uuid::new_v4(),
            assignment_id,
            user_id,
            status: SubmissionStatus::Submitted,
            file_url,
            submitted_at: at,
            grade: None,
            feedback: None,
        };
        tables.submissions.insert(submission.id, submission.clone());
        Ok((submission, true))
    }

    async fn find_submission(&self, id: Uuid) -> Result<Option<Submission>> {
        Ok(self.tables.read().await.submissions.get(&id).cloned())
    }

    async fn list_submissions(&self, assignment_id: Uuid) -> Result<Vec<Submission>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Submission> = tables
            .submissions
            .values()
            .filter(|s| s.assignment_id == assignment_id)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.submitted_at);
        Ok(rows)
    }

    async fn list_submissions_by_user(&self, user_id: Uuid) -> Result<Vec<Submission>> {
        let tables = self.tables.read().await;
        Ok(tables
            .submissions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn grade_submission(
        &self,
        id: Uuid,
        grade: i32,
        feedback: Option<String>,
    ) -> Result<Submission> {
        let mut tables = self.tables.write().await;
        let row = tables
            .submissions
            .get_mut(&id)
            .ok_or(StorageError::Missing("submission"))?;
        row.status = SubmissionStatus::Graded;
        row.grade = Some(grade);
        row.feedback = feedback;
        Ok(row.clone())
    }

    async fn create_thread(
        &self,
        course_id: Uuid,
        created_by: Uuid,
        title: &str,
        body: &str,
    ) -> Result<Thread> {
        let thread = Thread {
            id: Uuid::now_v7(),
            course_id,
            created_by,
            title: title.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        };
        self.tables
            .write()
            .await
            .threads
            .insert(thread.id, thread.clone());
        Ok(thread)
    }

    async fn find_thread(&self, id: Uuid) -> Result<Option<Thread>> {
        Ok(self.tables.read().await.threads.get(&id).cloned())
    }

    async fn list_threads(&self, course_id: Uuid) -> Result<Vec<Thread>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Thread> = tables
            .threads
            .values()
            .filter(|t| t.course_id == course_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn create_reply(&self, thread_id: Uuid, created_by: Uuid, body: &str) -> Result<Reply> {
        let reply = Reply {
            id: Uuid::now_v7(),
            thread_id,
            created_by,
            body: body.to_string(),
            created_at: Utc::now(),
        };
        self.tables
            .write()
            .await
            .replies
            .insert(reply.id, reply.clone());
        Ok(reply)
    }

    async fn list_replies(&self, thread_id: Uuid) -> Result<Vec<Reply>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Reply> = tables
            .replies
            .values()
            .filter(|r| r.thread_id == thread_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(rows)
    }
}
