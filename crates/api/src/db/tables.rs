//! Compile-time–checked column identifiers for all tables.

use sea_query::Iden;

#[derive(Iden)]
pub enum Users {
    Table,
    Id,
    Name,
    Email,
    PasswordHash,
    CreatedAt,
}

#[derive(Iden)]
pub enum RefreshTokens {
    Table,
    Id,
    UserId,
    TokenHash,
    ExpiresAt,
}

#[derive(Iden)]
pub enum Workspaces {
    Table,
    Id,
    Name,
    Description,
    InviteCode,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum Members {
    Table,
    Id,
    WorkspaceId,
    UserId,
    Role,
    JoinedAt,
}

#[derive(Iden)]
pub enum Projects {
    Table,
    Id,
    WorkspaceId,
    Name,
    Description,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum ProjectClients {
    Table,
    ProjectId,
    UserId,
}

#[derive(Iden)]
pub enum Tasks {
    Table,
    Id,
    WorkspaceId,
    ProjectId,
    Name,
    Description,
    Status,
    Priority,
    AssigneeId,
    DueDate,
    Position,
    EstimatedHours,
    Labels,
    CreatedBy,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum Bugs {
    Table,
    Id,
    WorkspaceId,
    ProjectId,
    Title,
    Description,
    BugType,
    Priority,
    Status,
    ReportedBy,
    AssignedTo,
    Metadata,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum Attendance {
    Table,
    Id,
    WorkspaceId,
    UserId,
    ProjectId,
    ShiftDate,
    StartTime,
    EndTime,
    TotalMinutes,
    Status,
    EndActivity,
    DailyTasks,
    CreatedAt,
}

#[derive(Iden)]
pub enum Notifications {
    Table,
    Id,
    UserId,
    WorkspaceId,
    Kind,
    Title,
    Message,
    Metadata,
    IsRead,
    CreatedAt,
}

#[derive(Iden)]
pub enum WeeklyReports {
    Table,
    Id,
    WorkspaceId,
    UserId,
    FromDate,
    ToDate,
    Department,
    Summary,
    TaskDetails,
    IsDraft,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum ClientInvitations {
    Table,
    Id,
    WorkspaceId,
    ProjectId,
    Email,
    TokenHash,
    InvitedBy,
    Status,
    ExpiresAt,
    AcceptedBy,
    AcceptedAt,
    CreatedAt,
}
