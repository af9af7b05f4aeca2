//! PostgreSQL store.
//!
//! Plain `sqlx` queries over the tables created by `migrations/`. Roles,
//! statuses and kinds are stored as text and decoded through their `FromStr`
//! impls; a value the enum does not know is reported as `StorageError::Decode`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
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
use crate::models::tenancy::{MemberSummary, Membership, MembershipStatus, OrgMembership, Organization};

type PrincipalRow = (Uuid, String, String, String, DateTime<Utc>, Option<DateTime<Utc>>);
type MembershipRow = (Uuid, Uuid, Uuid, String, String);
type OrganizationRow = (Uuid, String, String, DateTime<Utc>);
type CourseRow = (Uuid, Uuid, String, String, String, Uuid);
type ModuleRow = (Uuid, Uuid, String, i32);
type MaterialRow = (Uuid, Uuid, String, String, Option<String>);
type AssignmentRow = (Uuid, Uuid, String, DateTime<Utc>, i32, String, String);
type SubmissionRow = (
    Uuid,
    Uuid,
    Uuid,
    String,
    Option<String>,
    DateTime<Utc>,
    Option<i32>,
    Option<String>,
);
type ThreadRow = (Uuid, Uuid, Uuid, String, String, DateTime<Utc>);
type ReplyRow = (Uuid, Uuid, Uuid, String, DateTime<Utc>);

const PRINCIPAL_COLUMNS: &str = "id, email, name, role, created_at, last_login";
const MEMBERSHIP_COLUMNS: &str = "id, org_id, principal_id, role, status";
const COURSE_COLUMNS: &str = "id, org_id, code, title, description, created_by";
const ASSIGNMENT_COLUMNS: &str = "id, course_id, title, due_at, points, instructions, status";
const SUBMISSION_COLUMNS: &str =
    "id, assignment_id, user_id, status, file_url, submitted_at, grade, feedback";
const THREAD_COLUMNS: &str = "id, course_id, created_by, title, body, created_at";

fn principal_from_row(row: PrincipalRow) -> Result<Principal> {
    let (id, email, name, role, created_at, last_login) = row;
    Ok(Principal {
        id,
        email,
        name,
        role: role.parse()?,
        created_at,
        last_login,
    })
}

fn membership_from_row(row: MembershipRow) -> Result<Membership> {
    let (id, org_id, principal_id, role, status) = row;
    Ok(Membership {
        id,
        org_id,
        principal_id,
        role: role.parse()?,
        status: status.parse()?,
    })
}

fn organization_from_row(row: OrganizationRow) -> Organization {
    let (id, name, plan, created_at) = row;
    Organization {
        id,
        name,
        plan,
        created_at,
    }
}

fn course_from_row(row: CourseRow) -> Course {
    let (id, org_id, code, title, description, created_by) = row;
    Course {
        id,
        org_id,
        code,
        title,
        description,
        created_by,
    }
}

fn module_from_row(row: ModuleRow) -> Module {
    let (id, course_id, title, position) = row;
    Module {
        id,
        course_id,
        title,
        position,
    }
}

fn material_from_row(row: MaterialRow) -> Result<Material> {
    let (id, module_id, kind, title, source_url) = row;
    Ok(Material {
        id,
        module_id,
        kind: kind.parse()?,
        title,
        source_url,
    })
}

fn assignment_from_row(row: AssignmentRow) -> Result<Assignment> {
    let (id, course_id, title, due_at, points, instructions, status) = row;
    Ok(Assignment {
        id,
        course_id,
        title,
        due_at,
        points,
        instructions,
        status: status.parse::<AssignmentStatus>()?,
    })
}

fn submission_from_row(row: SubmissionRow) -> Result<Submission> {
    let (id, assignment_id, user_id, status, file_url, submitted_at, grade, feedback) = row;
    Ok(Submission {
        id,
        assignment_id,
        user_id,
        status: status.parse::<SubmissionStatus>()?,
        file_url,
        submitted_at,
        grade,
        feedback,
    })
}

fn thread_from_row(row: ThreadRow) -> Thread {
    let (id, course_id, created_by, title, body, created_at) = row;
    Thread {
        id,
        course_id,
        created_by,
        title,
        body,
        created_at,
    }
}

fn reply_from_row(row: ReplyRow) -> Reply {
    let (id, thread_id, created_by, body, created_at) = row;
    Reply {
        id,
        thread_id,
        created_by,
        body,
        created_at,
    }
}

/// Map a unique-constraint violation to `StorageError::Duplicate`.
fn unique_or_db(e: sqlx::Error, what: &'static str) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Duplicate(what),
        _ => StorageError::Db(e),
    }
}

/// PostgreSQL implementation of every repository trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded migrations in `myway_core/migrations/`.
    pub async fn migrate(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl PrincipalRepository for PgStore {
    async fn find_principal_by_email(&self, email: &str) -> Result<Option<PrincipalWithPassword>> {
        let row = sqlx::query_as::<_, (Uuid, String, String, String, DateTime<Utc>, Option<DateTime<Utc>>, String)>(
            "SELECT id, email, name, role, created_at, last_login, password_hash \
             FROM principals WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id, email, name, role, created_at, last_login, password_hash)| {
            Ok(PrincipalWithPassword {
                principal: principal_from_row((id, email, name, role, created_at, last_login))?,
                password_hash,
            })
        })
        .transpose()
    }

    async fn find_principal(&self, id: Uuid) -> Result<Option<Principal>> {
        let row = sqlx::query_as::<_, PrincipalRow>(&format!(
            "SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(principal_from_row).transpose()
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM principals WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create_principal(&self, new: NewPrincipal) -> Result<Principal> {
        let row = sqlx::query_as::<_, PrincipalRow>(&format!(
            "INSERT INTO principals (email, name, password_hash, role) VALUES ($1, $2, $3, $4) \
             RETURNING {PRINCIPAL_COLUMNS}"
        ))
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_or_db(e, "principal email"))?;
        principal_from_row(row)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE principals SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn save(
        &self,
        principal_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshCredential> {
        let (id, created_at) = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            "INSERT INTO refresh_credentials (id, principal_id, token_hash, expires_at) \
             VALUES ($1, $2, $3, $4) RETURNING id, created_at",
        )
        .bind(Uuid::now_v7())
        .bind(principal_id)
        .bind(token_digest(token))
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_or_db(e, "refresh credential"))?;
        Ok(RefreshCredential {
            id,
            principal_id,
            expires_at,
            created_at,
        })
    }

    async fn find_valid(
        &self,
        token: &str,
        principal_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshCredential>> {
        let row = sqlx::query_as::<_, (Uuid, Uuid, DateTime<Utc>, DateTime<Utc>)>(
            "SELECT id, principal_id, expires_at, created_at \
             FROM refresh_credentials \
             WHERE token_hash = $1 AND principal_id = $2 AND expires_at > $3",
        )
        .bind(token_digest(token))
        .bind(principal_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, principal_id, expires_at, created_at)| RefreshCredential {
            id,
            principal_id,
            expires_at,
            created_at,
        }))
    }

    async fn delete_by_value(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM refresh_credentials WHERE token_hash = $1")
            .bind(token_digest(token))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_all_for(&self, principal_id: Uuid) -> Result<u64> {
        let done = sqlx::query("DELETE FROM refresh_credentials WHERE principal_id = $1")
            .bind(principal_id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }
}

#[async_trait]
impl MembershipRepository for PgStore {
    async fn find_membership(&self, principal_id: Uuid, org_id: Uuid) -> Result<Option<Membership>> {
        let row = sqlx::query_as::<_, MembershipRow>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM memberships WHERE principal_id = $1 AND org_id = $2"
        ))
        .bind(principal_id)
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(membership_from_row).transpose()
    }

    async fn create_membership(
        &self,
        org_id: Uuid,
        principal_id: Uuid,
        role: Role,
        status: MembershipStatus,
    ) -> Result<Membership> {
        let row = sqlx::query_as::<_, MembershipRow>(&format!(
            "INSERT INTO memberships (org_id, principal_id, role, status) VALUES ($1, $2, $3, $4) \
             RETURNING {MEMBERSHIP_COLUMNS}"
        ))
        .bind(org_id)
        .bind(principal_id)
        .bind(role.as_str())
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_or_db(e, "membership"))?;
        membership_from_row(row)
    }

    async fn update_membership(
        &self,
        id: Uuid,
        role: Role,
        status: MembershipStatus,
    ) -> Result<Membership> {
        let row = sqlx::query_as::<_, MembershipRow>(&format!(
            "UPDATE memberships SET role = $2, status = $3 WHERE id = $1 \
             RETURNING {MEMBERSHIP_COLUMNS}"
        ))
        .bind(id)
        .bind(role.as_str())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::Missing("membership"))?;
        membership_from_row(row)
    }

    async fn list_memberships(&self, principal_id: Uuid) -> Result<Vec<OrgMembership>> {
        let rows = sqlx::query_as::<
            _,
            (Uuid, Uuid, Uuid, String, String, String, String, DateTime<Utc>),
        >(
            "SELECT m.id, m.org_id, m.principal_id, m.role, m.status, o.name, o.plan, o.created_at \
             FROM memberships m \
             JOIN organizations o ON o.id = m.org_id \
             WHERE m.principal_id = $1 \
             ORDER BY o.name",
        )
        .bind(principal_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, org_id, principal_id, role, status, name, plan, created_at)| {
                Ok(OrgMembership {
                    membership: membership_from_row((id, org_id, principal_id, role, status))?,
                    organization: organization_from_row((org_id, name, plan, created_at)),
                })
            })
            .collect()
    }

    async fn list_members(&self, org_id: Uuid) -> Result<Vec<MemberSummary>> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, String, String)>(
            "SELECT p.id, p.email, p.name, m.role, m.status \
             FROM memberships m \
             JOIN principals p ON p.id = m.principal_id \
             WHERE m.org_id = $1 \
             ORDER BY p.email",
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(principal_id, email, name, role, status)| {
                Ok(MemberSummary {
                    principal_id,
                    email,
                    name,
                    role: role.parse()?,
                    status: status.parse()?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl HierarchyRepository for PgStore {
    async fn organization_exists(&self, org_id: Uuid) -> Result<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM organizations WHERE id = $1)")
                .bind(org_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn course_org(&self, course_id: Uuid) -> Result<Option<Uuid>> {
        parent_of(&self.pool, "SELECT org_id FROM courses WHERE id = $1", course_id).await
    }

    async fn module_course(&self, module_id: Uuid) -> Result<Option<Uuid>> {
        parent_of(&self.pool, "SELECT course_id FROM modules WHERE id = $1", module_id).await
    }

    async fn material_module(&self, material_id: Uuid) -> Result<Option<Uuid>> {
        parent_of(&self.pool, "SELECT module_id FROM materials WHERE id = $1", material_id).await
    }

    async fn assignment_course(&self, assignment_id: Uuid) -> Result<Option<Uuid>> {
        parent_of(
            &self.pool,
            "SELECT course_id FROM assignments WHERE id = $1",
            assignment_id,
        )
        .await
    }

    async fn submission_assignment(&self, submission_id: Uuid) -> Result<Option<Uuid>> {
        parent_of(
            &self.pool,
            "SELECT assignment_id FROM submissions WHERE id = $1",
            submission_id,
        )
        .await
    }

    async fn thread_course(&self, thread_id: Uuid) -> Result<Option<Uuid>> {
        parent_of(&self.pool, "SELECT course_id FROM threads WHERE id = $1", thread_id).await
    }
}

/// Single parent-id lookup.
async fn parent_of(pool: &PgPool, sql: &'static str, id: Uuid) -> Result<Option<Uuid>> {
    let parent = sqlx::query_scalar::<_, Uuid>(sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(parent)
}

#[async_trait]
impl CatalogRepository for PgStore {
    async fn create_organization(&self, name: &str, owner: Uuid) -> Result<(Organization, Membership)> {
        let mut tx = self.pool.begin().await?;

        let org = sqlx::query_as::<_, OrganizationRow>(
            "INSERT INTO organizations (name) VALUES ($1) RETURNING id, name, plan, created_at",
        )
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;
        let org = organization_from_row(org);

        let membership = sqlx::query_as::<_, MembershipRow>(&format!(
            "INSERT INTO memberships (org_id, principal_id, role, status) VALUES ($1, $2, $3, $4) \
             RETURNING {MEMBERSHIP_COLUMNS}"
        ))
        .bind(org.id)
        .bind(owner)
        .bind(Role::Organizer.as_str())
        .bind(MembershipStatus::Active.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((org, membership_from_row(membership)?))
    }

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            "SELECT id, name, plan, created_at FROM organizations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(organization_from_row))
    }

    async fn create_course(&self, new: NewCourse) -> Result<Course> {
        let row = sqlx::query_as::<_, CourseRow>(&format!(
            "INSERT INTO courses (org_id, code, title, description, created_by) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {COURSE_COLUMNS}"
        ))
        .bind(new.org_id)
        .bind(&new.code)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(course_from_row(row))
    }

    async fn find_course(&self, id: Uuid) -> Result<Option<Course>> {
        let row = sqlx::query_as::<_, CourseRow>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(course_from_row))
    }

    async fn list_courses(&self, org_id: Uuid) -> Result<Vec<Course>> {
        let rows = sqlx::query_as::<_, CourseRow>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE org_id = $1 ORDER BY code"
        ))
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(course_from_row).collect())
    }

    async fn create_module(&self, new: NewModule) -> Result<Module> {
        let row = sqlx::query_as::<_, ModuleRow>(
            "INSERT INTO modules (course_id, title, position) VALUES ($1, $2, $3) \
             RETURNING id, course_id, title, position",
        )
        .bind(new.course_id)
        .bind(&new.title)
        .bind(new.position)
        .fetch_one(&self.pool)
        .await?;
        Ok(module_from_row(row))
    }

    async fn find_module(&self, id: Uuid) -> Result<Option<Module>> {
        let row = sqlx::query_as::<_, ModuleRow>(
            "SELECT id, course_id, title, position FROM modules WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(module_from_row))
    }

    async fn list_modules(&self, course_id: Uuid) -> Result<Vec<Module>> {
        let rows = sqlx::query_as::<_, ModuleRow>(
            "SELECT id, course_id, title, position FROM modules \
             WHERE course_id = $1 ORDER BY position",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(module_from_row).collect())
    }

    async fn create_material(&self, new: NewMaterial) -> Result<Material> {
        let row = sqlx::query_as::<_, MaterialRow>(
            "INSERT INTO materials (module_id, kind, title, source_url) VALUES ($1, $2, $3, $4) \
             RETURNING id, module_id, kind, title, source_url",
        )
        .bind(new.module_id)
        .bind(new.kind.as_str())
        .bind(&new.title)
        .bind(&new.source_url)
        .fetch_one(&self.pool)
        .await?;
        material_from_row(row)
    }

    async fn find_material(&self, id: Uuid) -> Result<Option<Material>> {
        let row = sqlx::query_as::<_, MaterialRow>(
            "SELECT id, module_id, kind, title, source_url FROM materials WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(material_from_row).transpose()
    }

    async fn list_materials(&self, module_id: Uuid) -> Result<Vec<Material>> {
        let rows = sqlx::query_as::<_, MaterialRow>(
            "SELECT id, module_id, kind, title, source_url FROM materials \
             WHERE module_id = $1 ORDER BY title",
        )
        .bind(module_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(material_from_row).collect()
    }

    async fn create_assignment(&self, new: NewAssignment) -> Result<Assignment> {
        let row = sqlx::query_as::<_, AssignmentRow>(&format!(
            "INSERT INTO assignments (course_id, title, due_at, points, instructions, status) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {ASSIGNMENT_COLUMNS}"
        ))
        .bind(new.course_id)
        .bind(&new.title)
        .bind(new.due_at)
        .bind(new.points)
        .bind(&new.instructions)
        .bind(AssignmentStatus::Active.as_str())
        .fetch_one(&self.pool)
        .await?;
        assignment_from_row(row)
    }

    async fn find_assignment(&self, id: Uuid) -> Result<Option<Assignment>> {
        let row = sqlx::query_as::<_, AssignmentRow>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(assignment_from_row).transpose()
    }

    async fn list_active_assignments(&self, course_id: Uuid) -> Result<Vec<Assignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments \
             WHERE course_id = $1 AND status = $2 ORDER BY due_at ASC"
        ))
        .bind(course_id)
        .bind(AssignmentStatus::Active.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(assignment_from_row).collect()
    }

    async fn upsert_submission(
        &self,
        assignment_id: Uuid,
        user_id: Uuid,
        file_url: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(Submission, bool)> {
        // `xmax = 0` is true only for a freshly inserted row.
        let row = sqlx::query_as::<_, (Uuid, Uuid, Uuid, String, Option<String>, DateTime<Utc>, Option<i32>, Option<String>, bool)>(
            &format!(
                "INSERT INTO submissions (assignment_id, user_id, status, file_url, submitted_at) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (assignment_id, user_id) DO UPDATE \
                 SET status = EXCLUDED.status, \
                     submitted_at = EXCLUDED.submitted_at, \
                     file_url = COALESCE(EXCLUDED.file_url, submissions.file_url) \
                 RETURNING {SUBMISSION_COLUMNS}, (xmax = 0)"
            ),
        )
        .bind(assignment_id)
        .bind(user_id)
        .bind(SubmissionStatus::Submitted.as_str())
        .bind(&file_url)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;

        let (id, assignment_id, user_id, status, file_url, submitted_at, grade, feedback, created) =
            row;
        let submission = submission_from_row((
            id,
            assignment_id,
            user_id,
            status,
            file_url,
            submitted_at,
            grade,
            feedback,
        ))?;
        Ok((submission, created))
    }

    async fn find_submission(&self, id: Uuid) -> Result<Option<Submission>> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(submission_from_row).transpose()
    }

    async fn list_submissions(&self, assignment_id: Uuid) -> Result<Vec<Submission>> {
        let rows = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions \
             WHERE assignment_id = $1 ORDER BY submitted_at"
        ))
        .bind(assignment_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(submission_from_row).collect()
    }

    async fn list_submissions_by_user(&self, user_id: Uuid) -> Result<Vec<Submission>> {
        let rows = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(submission_from_row).collect()
    }

    async fn grade_submission(
        &self,
        id: Uuid,
        grade: i32,
        feedback: Option<String>,
    ) -> Result<Submission> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "UPDATE submissions SET status = $2, grade = $3, feedback = $4 WHERE id = $1 \
             RETURNING {SUBMISSION_COLUMNS}"
        ))
        .bind(id)
        .bind(SubmissionStatus::Graded.as_str())
        .bind(grade)
        .bind(&feedback)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::Missing("submission"))?;
        submission_from_row(row)
    }

    async fn create_thread(
        &self,
        course_id: Uuid,
        created_by: Uuid,
        title: &str,
        body: &str,
    ) -> Result<Thread> {
        let row = sqlx::query_as::<_, ThreadRow>(&format!(
            "INSERT INTO threads (id, course_id, created_by, title, body) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {THREAD_COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(course_id)
        .bind(created_by)
        .bind(title)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;
        Ok(thread_from_row(row))
    }

    async fn find_thread(&self, id: Uuid) -> Result<Option<Thread>> {
        let row = sqlx::query_as::<_, ThreadRow>(&format!(
            "SELECT {THREAD_COLUMNS} FROM threads WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(thread_from_row))
    }

    async fn list_threads(&self, course_id: Uuid) -> Result<Vec<Thread>> {
        let rows = sqlx::query_as::<_, ThreadRow>(&format!(
            "SELECT {THREAD_COLUMNS} FROM threads WHERE course_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(thread_from_row).collect())
    }

    async fn create_reply(&self, thread_id: Uuid, created_by: Uuid, body: &str) -> Result<Reply> {
        let row = sqlx::query_as::<_, ReplyRow>(
            "INSERT INTO replies (id, thread_id, created_by, body) VALUES ($1, $2, $3, $4) \
             RETURNING id, thread_id, created_by, body, created_at",
        )
        .bind(Uuid::now_v7())
        .bind(thread_id)
        .bind(created_by)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;
        Ok(reply_from_row(row))
    }

    async fn list_replies(&self, thread_id: Uuid) -> Result<Vec<Reply>> {
        let rows = sqlx::query_as::<_, ReplyRow>(
            "SELECT id, thread_id, created_by, body, created_at FROM replies \
             WHERE thread_id = $1 ORDER BY created_at, id",
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(reply_from_row).collect())
    }
}
