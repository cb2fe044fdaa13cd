//! Project boards: export of classic and v2 projects, creation of v2 projects
//!
//! Both exports write the same JSON records, a classic project becoming a v2
//! project whose `Status` field lists its columns. create-projects-v2 reads
//! those records back and recreates the projects with their items.
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

use clap::Args;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{
    config::GithubConfig,
    platform::{graphql_page_variables, GithubPlatform, MAX_PER_PAGE},
    queries,
    teams::NESTED_PAGE_DELAY_FACTOR,
};
use crate::{
    config::OrgMoverConfig,
    context::{CommonArgs, Scope},
    errors::{OrgMoverError, OrgMoverErrorKind},
    http::Outcome,
    pagination::{collect_pages, complete_connection, Connection, Edge},
    records::{create_parent_dir, current_time, output_path, rows_after, CsvSink},
    utils::{row_progress, spinner, value_or_prompt},
};

/// Single select field holding the column of an item
const STATUS_FIELD: &str = "Status";

/// Columns of the create-projects-v2 status file
const PROJECT_STATUS_COLUMNS: [&str; 6] = [
    "title",
    "items",
    "addedItems",
    "status",
    "statusText",
    "errorMessage",
];

/// Export the projects of an organization
#[derive(Args, Debug, Clone)]
pub struct ExportProjectsArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,
}

/// Create v2 projects from a projects export
#[derive(Args, Debug, Clone)]
pub struct CreateProjectsArgs {
    #[command(flatten)]
    /// Common flags
    pub common: CommonArgs,

    /// JSON file written by export-projects-v1 or export-projects-v2
    #[arg(short = 'f', long)]
    pub input_file: Option<PathBuf>,

    /// Skip the first N projects of the input file
    #[arg(short, long, default_value_t = 0)]
    pub skip: usize,
}

/// Project of the export file
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct ProjectRecord {
    /// Node id on the source
    pub id: String,
    pub number: u64,
    pub title: String,
    pub readme: Option<String>,
    pub short_description: Option<String>,
    pub public: bool,
    pub fields: Vec<ProjectField>,
    pub items: Vec<ProjectItem>,
}

impl ProjectRecord {
    /// Options of the `Status` field
    fn statuses(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|field| field.name == STATUS_FIELD)
            .flat_map(|field| field.options.iter().map(|option| option.name.as_str()))
            .collect()
    }
}

/// Field of a project
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct ProjectField {
    pub name: String,
    /// `TEXT`, `SINGLE_SELECT`, `DATE`...
    pub data_type: String,
    /// Options of a single select field
    pub options: Vec<FieldOption>,
}

/// Option of a single select field
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub(crate) struct FieldOption {
    pub name: String,
    pub color: Option<String>,
    pub description: Option<String>,
}

/// Item of a project
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct ProjectItem {
    /// Value of the `Status` field
    pub status: Option<String>,
    pub is_archived: bool,
    /// Null when the content is hidden from the token
    pub content: Option<ItemContent>,
}

/// Content of a project item
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "__typename")]
pub(crate) enum ItemContent {
    /// Draft issue living in the project only
    DraftIssue {
        title: String,
        #[serde(default)]
        body: String,
    },
    /// Issue of a repository
    Issue {
        number: u64,
        title: String,
        repository: RepositoryName,
    },
    /// Pull request of a repository
    PullRequest {
        number: u64,
        title: String,
        repository: RepositoryName,
    },
}

/// Repository of an issue or a pull request
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct RepositoryName {
    pub name: String,
}

/// `nodes` list of a GraphQL field
#[derive(Deserialize, Debug)]
struct Nodes<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
}

impl<T> Default for Nodes<T> {
    fn default() -> Self {
        Self { nodes: vec![] }
    }
}

/// `node` field of a GraphQL answer
#[derive(Deserialize, Debug)]
struct NodeData<T> {
    node: Option<T>,
}

/// Node of a nested query, failing if it disappeared
fn existing_node<T>(data: NodeData<T>, name: &str) -> Result<T, OrgMoverError> {
    data.node.ok_or_else(|| {
        OrgMoverError::new(OrgMoverErrorKind::GraphQl).with_text(&format!("'{name}' not found"))
    })
}

/// `projectsV2` field of an organization
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ProjectsV2Field {
    projects_v2: Connection<Edge<ProjectV2Node>>,
}

/// Project node of the export query
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ProjectV2Node {
    id: String,
    number: u64,
    title: String,
    readme: Option<String>,
    short_description: Option<String>,
    #[serde(default)]
    public: bool,
    #[serde(default)]
    fields: Nodes<FieldNode>,
    items: Connection<Edge<ItemNode>>,
}

impl ProjectV2Node {
    /// Export record with the complete list of items
    fn into_record(self, items: Vec<Edge<ItemNode>>) -> ProjectRecord {
        ProjectRecord {
            id: self.id,
            number: self.number,
            title: self.title,
            readme: self.readme,
            short_description: self.short_description,
            public: self.public,
            fields: self
                .fields
                .nodes
                .into_iter()
                .filter_map(FieldNode::into_field)
                .collect(),
            items: items.into_iter().map(|edge| edge.node.into_item()).collect(),
        }
    }
}

/// Field node, empty for field types without a common name
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
struct FieldNode {
    name: Option<String>,
    data_type: Option<String>,
    options: Vec<FieldOption>,
}

impl FieldNode {
    fn into_field(self) -> Option<ProjectField> {
        Some(ProjectField {
            name: self.name?,
            data_type: self.data_type.unwrap_or_default(),
            options: self.options,
        })
    }
}

/// Item node of the export queries
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ItemNode {
    #[serde(default)]
    is_archived: bool,
    field_value_by_name: Option<StatusValue>,
    content: Option<ItemContent>,
}

impl ItemNode {
    fn into_item(self) -> ProjectItem {
        ProjectItem {
            status: self.field_value_by_name.and_then(|value| value.name),
            is_archived: self.is_archived,
            content: self.content,
        }
    }
}

/// Value of the `Status` field of an item
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct StatusValue {
    name: Option<String>,
}

/// `items` field of a project node
#[derive(Deserialize, Debug)]
struct ItemsField {
    items: Connection<Edge<ItemNode>>,
}

/// `projects` field of an organization
#[derive(Deserialize, Debug)]
struct ProjectsV1Field {
    projects: Connection<Edge<ClassicProjectNode>>,
}

/// Classic project node
#[derive(Deserialize, Debug)]
struct ClassicProjectNode {
    id: String,
    number: u64,
    name: String,
    body: Option<String>,
    #[serde(default)]
    columns: Nodes<ColumnNode>,
}

/// Column of a classic project
#[derive(Deserialize, Debug)]
struct ColumnNode {
    id: String,
    name: String,
    cards: Connection<Edge<CardNode>>,
}

/// Card of a classic project column
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CardNode {
    note: Option<String>,
    state: Option<String>,
    #[serde(default)]
    is_archived: bool,
    content: Option<ItemContent>,
}

/// `cards` field of a column node
#[derive(Deserialize, Debug)]
struct CardsField {
    cards: Connection<Edge<CardNode>>,
}

/// Item of a card, notes become draft issues titled with their first line
fn card_item(card: CardNode, column: &str) -> ProjectItem {
    let content = match card.state.as_deref() {
        Some("NOTE_ONLY") => card.note.map(|note| ItemContent::DraftIssue {
            title: note.lines().next().unwrap_or_default().trim().to_string(),
            body: note,
        }),
        _ => card.content,
    };
    ProjectItem {
        status: Some(column.to_string()),
        is_archived: card.is_archived,
        content,
    }
}

/// Export record of a classic project and its columns
fn classic_record(
    id: String,
    number: u64,
    name: String,
    body: Option<String>,
    columns: Vec<(String, Vec<CardNode>)>,
) -> ProjectRecord {
    let status = ProjectField {
        name: STATUS_FIELD.to_string(),
        data_type: "SINGLE_SELECT".to_string(),
        options: columns
            .iter()
            .map(|(column, _)| FieldOption {
                name: column.clone(),
                ..Default::default()
            })
            .collect(),
    };
    let items = columns
        .into_iter()
        .flat_map(|(column, cards)| {
            cards
                .into_iter()
                .map(move |card| card_item(card, &column))
                .collect::<Vec<_>>()
        })
        .collect();
    ProjectRecord {
        id,
        number,
        title: name,
        readme: None,
        short_description: body,
        public: false,
        fields: vec![status],
        items,
    }
}

/// Every v2 project of the organization with all its items
/// # Errors
/// Error if a page can't be fetched
pub(crate) async fn fetch_projects_v2(
    platform: &GithubPlatform,
    scope: &Scope,
) -> Result<Vec<ProjectRecord>, OrgMoverError> {
    let edges = collect_pages(&scope.throttle, "projects", |cursor| {
        let variables = graphql_page_variables(scope, cursor);
        async move {
            let field: ProjectsV2Field = platform
                .organization(queries::ORG_PROJECTS_V2, variables)
                .await?;
            Ok(field.projects_v2.into_page())
        }
    })
    .await?;
    let nested_throttle = scope.throttle.scaled(NESTED_PAGE_DELAY_FACTOR);
    let first = scope.batch_size.min(MAX_PER_PAGE);
    let mut projects = vec![];
    for Edge { mut node } in edges {
        debug!("Completing project {}", node.title);
        let items_page = std::mem::replace(&mut node.items, Connection::empty());
        let id = node.id.clone();
        let title = node.title.clone();
        let items = complete_connection(items_page, &nested_throttle, |after| {
            let variables = json!({ "id": id, "first": first, "after": after });
            let title = title.clone();
            async move {
                let data: NodeData<ItemsField> =
                    platform.graphql(queries::PROJECT_V2_ITEMS, variables).await?;
                Ok(existing_node(data, &title)?.items)
            }
        })
        .await?;
        projects.push(node.into_record(items));
    }
    Ok(projects)
}

/// Every classic project of the organization converted to a v2 record
/// # Errors
/// Error if a page can't be fetched
pub(crate) async fn fetch_projects_v1(
    platform: &GithubPlatform,
    scope: &Scope,
) -> Result<Vec<ProjectRecord>, OrgMoverError> {
    let edges = collect_pages(&scope.throttle, "classic projects", |cursor| {
        let variables = graphql_page_variables(scope, cursor);
        async move {
            let field: ProjectsV1Field = platform
                .organization(queries::ORG_PROJECTS_V1, variables)
                .await?;
            Ok(field.projects.into_page())
        }
    })
    .await?;
    let nested_throttle = scope.throttle.scaled(NESTED_PAGE_DELAY_FACTOR);
    let first = scope.batch_size.min(MAX_PER_PAGE);
    let mut projects = vec![];
    for Edge { node } in edges {
        debug!("Completing classic project {}", node.name);
        let mut columns = vec![];
        for column in node.columns.nodes {
            let ColumnNode { id, name, cards } = column;
            let cards = complete_connection(cards, &nested_throttle, |after| {
                let variables = json!({ "id": id, "first": first, "after": after });
                let name = name.clone();
                async move {
                    let data: NodeData<CardsField> = platform
                        .graphql(queries::PROJECT_COLUMN_CARDS, variables)
                        .await?;
                    Ok(existing_node(data, &name)?.cards)
                }
            })
            .await?;
            columns.push((name, cards.into_iter().map(|edge| edge.node).collect()));
        }
        projects.push(classic_record(
            node.id, node.number, node.name, node.body, columns,
        ));
    }
    Ok(projects)
}

/// Write the projects as pretty JSON
/// # Errors
/// Error if the file can't be written
fn write_projects(path: &Path, projects: &[ProjectRecord]) -> Result<(), OrgMoverError> {
    create_parent_dir(path)?;
    let file = File::create(path).map_err(|e| {
        OrgMoverError::new_with_source(&format!("Unable to create {}", path.display()), e)
    })?;
    serde_json::to_writer_pretty(BufWriter::new(file), projects)?;
    println!("Exporting Completed: {}", path.display());
    Ok(())
}

/// Projects of an export file, prompting for its path when missing
/// # Errors
/// Error if the file can't be read or isn't a projects export
fn read_projects(input_file: Option<PathBuf>) -> Result<Vec<ProjectRecord>, OrgMoverError> {
    let path = match input_file {
        Some(path) => path,
        None => PathBuf::from(value_or_prompt(None, "Enter the input file path")?),
    };
    let file = File::open(&path).map_err(|e| {
        OrgMoverError::new_with_source(&format!("Unable to read {}", path.display()), e)
    })?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Output path of a projects export
fn projects_path(scope: &Scope, kind: &str, flavor: &str) -> PathBuf {
    let org = scope.org_slug();
    let dir = PathBuf::from(format!("./{org}-metrics"));
    output_path(
        scope.output_file.as_deref(),
        "json",
        dir.join(format!("{org}-{kind}-{flavor}-{}.json", current_time())),
    )
}

/// Run export-projects-v2
/// # Errors
/// Error if the projects can't be fetched or the file can't be written
pub async fn export_projects_v2(
    config: &mut OrgMoverConfig,
    args: ExportProjectsArgs,
) -> Result<(), OrgMoverError> {
    let platform = GithubConfig::from_args(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let pb = spinner("export-projects-v2");
    pb.set_message(format!("Fetching projects of {}", scope.organization));
    let projects = fetch_projects_v2(&platform, &scope).await?;
    pb.finish_and_clear();
    info!("{} projects fetched", projects.len());
    write_projects(
        &projects_path(&scope, "projects-v2", platform.flavor()),
        &projects,
    )
}

/// Run export-projects-v1
/// # Errors
/// Error if the projects can't be fetched or the file can't be written
pub async fn export_projects_v1(
    config: &mut OrgMoverConfig,
    args: ExportProjectsArgs,
) -> Result<(), OrgMoverError> {
    let platform = GithubConfig::from_args(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let pb = spinner("export-projects-v1");
    pb.set_message(format!("Fetching classic projects of {}", scope.organization));
    let projects = fetch_projects_v1(&platform, &scope).await?;
    pb.finish_and_clear();
    info!("{} classic projects fetched", projects.len());
    write_projects(
        &projects_path(&scope, "projects-v1", platform.flavor()),
        &projects,
    )
}

/// Comparison key of a status: lowercase without spaces
fn status_key(status: &str) -> String {
    status
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// `id` field
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
struct NodeId {
    id: String,
}

/// Project found or created on the target
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct TargetProject {
    id: String,
    title: String,
    fields: Nodes<TargetField>,
}

/// Single select field of a target project, empty for other field types
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct TargetField {
    id: Option<String>,
    name: Option<String>,
    options: Vec<TargetOption>,
}

/// Option of a target single select field
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct TargetOption {
    id: String,
    name: String,
}

impl TargetProject {
    /// `Status` field
    fn status_field(&self) -> Option<&TargetField> {
        self.fields
            .nodes
            .iter()
            .find(|field| field.name.as_deref() == Some(STATUS_FIELD))
    }

    /// Field id and option id of a status
    fn status_option(&self, status: &str) -> Option<(&str, &str)> {
        let field = self.status_field()?;
        let key = status_key(status);
        let option = field
            .options
            .iter()
            .find(|option| status_key(&option.name) == key)?;
        Some((field.id.as_deref()?, option.id.as_str()))
    }
}

/// Source statuses the target project lacks
fn missing_statuses(source: &ProjectRecord, target: &TargetProject) -> Vec<String> {
    let target_keys: Vec<String> = target
        .status_field()
        .map(|field| field.options.iter().map(|o| status_key(&o.name)).collect())
        .unwrap_or_default();
    source
        .statuses()
        .into_iter()
        .filter(|status| !target_keys.contains(&status_key(status)))
        .map(str::to_string)
        .collect()
}

/// Warn about the statuses to add by hand on the target
fn log_missing_statuses(source: &ProjectRecord, target: &TargetProject) {
    let missing = missing_statuses(source, target);
    if !missing.is_empty() {
        warn!(
            "Add these statuses to the project {} first: {}",
            source.title,
            missing.join(", ")
        );
    }
}

/// `projectsV2` search of an organization
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct FoundProjects {
    projects_v2: Nodes<TargetProject>,
}

/// `createProjectV2` answer
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CreatedProject {
    create_project_v2: CreatedProjectPayload,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CreatedProjectPayload {
    project_v2: TargetProject,
}

/// `addProjectV2DraftIssue` answer
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct AddedDraftIssue {
    #[serde(rename = "addProjectV2DraftIssue")]
    added: AddedDraftIssuePayload,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct AddedDraftIssuePayload {
    project_item: NodeId,
}

/// `addProjectV2ItemById` answer
#[derive(Deserialize, Debug)]
struct AddedItem {
    #[serde(rename = "addProjectV2ItemById")]
    added: AddedItemPayload,
}

#[derive(Deserialize, Debug)]
struct AddedItemPayload {
    item: NodeId,
}

/// `repository` lookup of an issue or a pull request
#[derive(Deserialize, Debug)]
struct RepositoryData {
    repository: Option<IssueRepository>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct IssueRepository {
    issue_or_pull_request: Option<NodeId>,
}

/// Project of the organization with exactly this title
/// # Errors
/// Error if the search fails
async fn find_project(
    platform: &GithubPlatform,
    org: &str,
    title: &str,
) -> Result<Option<TargetProject>, OrgMoverError> {
    let found: FoundProjects = platform
        .organization(
            queries::FIND_PROJECT_V2,
            json!({ "org": org, "title": title }),
        )
        .await?;
    Ok(found
        .projects_v2
        .nodes
        .into_iter()
        .find(|project| project.title == title))
}

/// Create the project and copy its visibility and descriptions
/// # Errors
/// Error if the project can't be created
async fn create_project(
    platform: &GithubPlatform,
    owner_id: &str,
    project: &ProjectRecord,
) -> Result<TargetProject, OrgMoverError> {
    let created: CreatedProject = platform
        .graphql(
            queries::CREATE_PROJECT_V2,
            json!({ "ownerId": owner_id, "title": project.title }),
        )
        .await?;
    let target = created.create_project_v2.project_v2;
    let updated: Result<Value, _> = platform
        .graphql(
            queries::UPDATE_PROJECT_V2,
            json!({
                "projectId": target.id,
                "public": project.public,
                "readme": project.readme,
                "shortDescription": project.short_description,
            }),
        )
        .await;
    if let Err(e) = updated {
        warn!("{} created but not updated: {e}", project.title);
    }
    Ok(target)
}

/// Node id of an issue or a pull request
/// # Errors
/// Error if the lookup fails or finds nothing
async fn content_id(
    platform: &GithubPlatform,
    org: &str,
    repo: &str,
    number: u64,
) -> Result<String, OrgMoverError> {
    let data: RepositoryData = platform
        .graphql(
            queries::ISSUE_OR_PULL_REQUEST_ID,
            json!({ "owner": org, "repo": repo, "number": number }),
        )
        .await?;
    data.repository
        .and_then(|repository| repository.issue_or_pull_request)
        .map(|node| node.id)
        .ok_or_else(|| {
            OrgMoverError::new(OrgMoverErrorKind::GraphQl)
                .with_text(&format!("{repo}#{number} not found"))
        })
}

/// Add one item and set its status, false when the item has no content to copy
/// # Errors
/// Error if the item can't be added
async fn add_item(
    platform: &GithubPlatform,
    org: &str,
    target: &TargetProject,
    item: &ProjectItem,
) -> Result<bool, OrgMoverError> {
    let item_id = match &item.content {
        Some(ItemContent::DraftIssue { title, body }) => {
            let added: AddedDraftIssue = platform
                .graphql(
                    queries::ADD_PROJECT_V2_DRAFT_ISSUE,
                    json!({ "projectId": target.id, "title": title, "body": body }),
                )
                .await?;
            added.added.project_item.id
        }
        Some(
            ItemContent::Issue {
                number, repository, ..
            }
            | ItemContent::PullRequest {
                number, repository, ..
            },
        ) => {
            let content_id = content_id(platform, org, &repository.name, *number).await?;
            let added: AddedItem = platform
                .graphql(
                    queries::ADD_PROJECT_V2_ITEM,
                    json!({ "projectId": target.id, "contentId": content_id }),
                )
                .await?;
            added.added.item.id
        }
        None => {
            debug!("Item without content skipped");
            return Ok(false);
        }
    };
    let Some(status) = &item.status else {
        return Ok(true);
    };
    match target.status_option(status) {
        Some((field_id, option_id)) => {
            let set: Result<Value, _> = platform
                .graphql(
                    queries::SET_PROJECT_V2_ITEM_STATUS,
                    json!({
                        "projectId": target.id,
                        "itemId": item_id,
                        "fieldId": field_id,
                        "optionId": option_id,
                    }),
                )
                .await;
            if let Err(e) = set {
                warn!("Status {status} not set on {}: {e}", target.title);
            }
        }
        None => debug!("Status {status} missing on {}", target.title),
    }
    Ok(true)
}

/// Recreate one project with its items, returning the outcome and the number of added items
async fn import_project(
    platform: &GithubPlatform,
    scope: &Scope,
    owner_id: &str,
    project: &ProjectRecord,
) -> (Outcome, usize) {
    match find_project(platform, &scope.organization, &project.title).await {
        Ok(Some(existing)) => {
            log_missing_statuses(project, &existing);
            info!("{} already exists, items not added", project.title);
            let outcome = Outcome {
                status_text: "Already exists".to_string(),
                ..Outcome::success()
            };
            return (outcome, 0);
        }
        Ok(None) => {}
        Err(e) => return (Outcome::from(&e), 0),
    }
    let target = match create_project(platform, owner_id, project).await {
        Ok(target) => target,
        Err(e) => return (Outcome::from(&e), 0),
    };
    log_missing_statuses(project, &target);
    let mut added = 0;
    for item in &project.items {
        match add_item(platform, &scope.organization, &target, item).await {
            Ok(true) => added += 1,
            Ok(false) => {}
            Err(e) => warn!("{}: item not added: {e}", project.title),
        }
        scope.throttle.wait().await;
    }
    (Outcome::success(), added)
}

/// Run create-projects-v2
/// # Errors
/// Error if the input file can't be read, the organization can't be found or the status file can't be written
pub async fn create_projects_v2(
    config: &mut OrgMoverConfig,
    args: CreateProjectsArgs,
) -> Result<(), OrgMoverError> {
    let platform = GithubConfig::from_args(config, &args.common)?;
    let scope = Scope::from_args(&args.common)?;
    let projects = read_projects(args.input_file)?;
    let owner: NodeId = platform
        .organization(queries::ORG_ID, json!({ "org": scope.organization }))
        .await?;
    let org = scope.org_slug();
    let path = scope.output_csv(format!(
        "{org}-create-projects-v2-status-{}.csv",
        current_time()
    ));
    let mut sink = CsvSink::create(path, &PROJECT_STATUS_COLUMNS)?;
    let total = projects.len();
    let pb = spinner("");
    for (index, project) in rows_after(projects, args.skip) {
        row_progress(index, total, &pb, format!("Creating {}", project.title));
        let (outcome, added) = import_project(&platform, &scope, &owner.id, &project).await;
        if outcome.is_success() {
            info!("{}: {added}/{} items added", project.title, project.items.len());
        } else {
            warn!("{}: {}", project.title, outcome.error_message);
        }
        sink.write(&(
            &project.title,
            project.items.len(),
            added,
            &outcome.status,
            &outcome.status_text,
            &outcome.error_message,
        ))?;
        scope.throttle.wait().await;
    }
    pb.finish_and_clear();
    sink.finish()?;
    Ok(())
}
