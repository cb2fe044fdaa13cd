//! GraphQL documents sent to GitHub
//!
//! Every paginated query takes `$org`, `$first` and `$after` so that it can be
//! driven by [`crate::pagination::collect_pages`].

/// Repositories of an organization with their activity counters
pub(crate) const ORG_REPOSITORIES: &str = r#"
query($org: String!, $first: Int!, $after: String) {
  organization(login: $org) {
    repositories(first: $first, after: $after) {
      totalCount
      pageInfo { hasNextPage endCursor }
      edges {
        node {
          name
          pushedAt
          updatedAt
          isArchived
          visibility
          hasWikiEnabled
          diskUsage
          pullRequests { totalCount }
          issues { totalCount }
          projectsV2 { totalCount }
          discussions { totalCount }
          packages { totalCount }
          releases { totalCount }
        }
      }
    }
  }
}
"#;

/// Organization counters used in the org metrics file
pub(crate) const ORG_INFO: &str = r#"
query($org: String!) {
  organization(login: $org) {
    projectsV2 { totalCount }
    membersWithRole { totalCount }
  }
}
"#;

/// Teams of an organization with the first page of members and repositories
pub(crate) const ORG_TEAMS: &str = r#"
query($org: String!, $first: Int!, $after: String) {
  organization(login: $org) {
    teams(first: $first, after: $after) {
      totalCount
      pageInfo { hasNextPage endCursor }
      edges {
        node {
          name
          combinedSlug
          createdAt
          databaseId
          description
          privacy
          repositoriesResourcePath
          resourcePath
          slug
          updatedAt
          url
          repositoriesUrl
          childTeams { totalCount }
          parentTeam { databaseId slug }
          repositories(first: $first) {
            totalCount
            pageInfo { hasNextPage endCursor }
            edges { permission node { name } }
          }
          members(first: $first) {
            totalCount
            pageInfo { hasNextPage endCursor }
            edges { role node { login email } }
          }
        }
      }
    }
  }
}
"#;

/// Next page of the members of a team
pub(crate) const TEAM_MEMBERS: &str = r#"
query($org: String!, $slug: String!, $first: Int!, $after: String) {
  organization(login: $org) {
    team(slug: $slug) {
      members(first: $first, after: $after) {
        totalCount
        pageInfo { hasNextPage endCursor }
        edges { role node { login email } }
      }
    }
  }
}
"#;

/// Next page of the repositories of a team
pub(crate) const TEAM_REPOSITORIES: &str = r#"
query($org: String!, $slug: String!, $first: Int!, $after: String) {
  organization(login: $org) {
    team(slug: $slug) {
      repositories(first: $first, after: $after) {
        totalCount
        pageInfo { hasNextPage endCursor }
        edges { permission node { name } }
      }
    }
  }
}
"#;

/// Members of an organization with their role
pub(crate) const ORG_MEMBERS: &str = r#"
query($org: String!, $first: Int!, $after: String) {
  organization(login: $org) {
    membersWithRole(first: $first, after: $after) {
      totalCount
      pageInfo { hasNextPage endCursor }
      edges {
        role
        hasTwoFactorEnabled
        node {
          login
          name
          email
          avatarUrl
          databaseId
          url
          websiteUrl
          isSiteAdmin
          isViewer
          projectsUrl
          projectsResourcePath
          createdAt
          updatedAt
        }
      }
    }
  }
}
"#;

/// Repository migrations into an organization
pub(crate) const REPOSITORY_MIGRATIONS: &str = r#"
query($org: String!, $first: Int!, $after: String) {
  organization(login: $org) {
    repositoryMigrations(first: $first, after: $after) {
      totalCount
      pageInfo { hasNextPage endCursor }
      edges {
        node {
          repositoryName
          createdAt
          state
          failureReason
          warningsCount
          migrationLogUrl
          sourceUrl
        }
      }
    }
  }
}
"#;

/// Projects of an organization with their fields and first page of items
pub(crate) const ORG_PROJECTS_V2: &str = r#"
query($org: String!, $first: Int!, $after: String) {
  organization(login: $org) {
    projectsV2(first: $first, after: $after) {
      totalCount
      pageInfo { hasNextPage endCursor }
      edges {
        node {
          id
          number
          title
          readme
          shortDescription
          public
          fields(first: 20) {
            nodes {
              ... on ProjectV2FieldCommon { name dataType }
              ... on ProjectV2SingleSelectField { options { name color description } }
            }
          }
          items(first: $first) {
            totalCount
            pageInfo { hasNextPage endCursor }
            edges {
              node {
                isArchived
                fieldValueByName(name: "Status") {
                  ... on ProjectV2ItemFieldSingleSelectValue { name }
                }
                content {
                  __typename
                  ... on DraftIssue { title body }
                  ... on Issue { number title repository { name } }
                  ... on PullRequest { number title repository { name } }
                }
              }
            }
          }
        }
      }
    }
  }
}
"#;

/// Next items of a project
pub(crate) const PROJECT_V2_ITEMS: &str = r#"
query($id: ID!, $first: Int!, $after: String) {
  node(id: $id) {
    ... on ProjectV2 {
      items(first: $first, after: $after) {
        totalCount
        pageInfo { hasNextPage endCursor }
        edges {
          node {
            isArchived
            fieldValueByName(name: "Status") {
              ... on ProjectV2ItemFieldSingleSelectValue { name }
            }
            content {
              __typename
              ... on DraftIssue { title body }
              ... on Issue { number title repository { name } }
              ... on PullRequest { number title repository { name } }
            }
          }
        }
      }
    }
  }
}
"#;

/// Classic projects of an organization with their columns and first page of cards
pub(crate) const ORG_PROJECTS_V1: &str = r#"
query($org: String!, $first: Int!, $after: String) {
  organization(login: $org) {
    projects(first: $first, after: $after) {
      totalCount
      pageInfo { hasNextPage endCursor }
      edges {
        node {
          id
          number
          name
          body
          columns(first: 50) {
            nodes {
              id
              name
              cards(first: $first) {
                totalCount
                pageInfo { hasNextPage endCursor }
                edges {
                  node {
                    note
                    state
                    isArchived
                    content {
                      __typename
                      ... on Issue { number title repository { name } }
                      ... on PullRequest { number title repository { name } }
                    }
                  }
                }
              }
            }
          }
        }
      }
    }
  }
}
"#;

/// Next cards of a classic project column
pub(crate) const PROJECT_COLUMN_CARDS: &str = r#"
query($id: ID!, $first: Int!, $after: String) {
  node(id: $id) {
    ... on ProjectColumn {
      cards(first: $first, after: $after) {
        totalCount
        pageInfo { hasNextPage endCursor }
        edges {
          node {
            note
            state
            isArchived
            content {
              __typename
              ... on Issue { number title repository { name } }
              ... on PullRequest { number title repository { name } }
            }
          }
        }
      }
    }
  }
}
"#;

/// Node id of an organization
pub(crate) const ORG_ID: &str = r#"
query($org: String!) {
  organization(login: $org) { id }
}
"#;

/// Projects of an organization matching a title, with their status options
pub(crate) const FIND_PROJECT_V2: &str = r#"
query($org: String!, $title: String!) {
  organization(login: $org) {
    projectsV2(first: 20, query: $title) {
      nodes {
        id
        title
        fields(first: 20) {
          nodes {
            ... on ProjectV2SingleSelectField { id name options { id name } }
          }
        }
      }
    }
  }
}
"#;

/// Create a project owned by an organization
pub(crate) const CREATE_PROJECT_V2: &str = r#"
mutation($ownerId: ID!, $title: String!) {
  createProjectV2(input: { ownerId: $ownerId, title: $title }) {
    projectV2 {
      id
      title
      fields(first: 20) {
        nodes {
          ... on ProjectV2SingleSelectField { id name options { id name } }
        }
      }
    }
  }
}
"#;

/// Copy the visibility and descriptions of a project
pub(crate) const UPDATE_PROJECT_V2: &str = r#"
mutation($projectId: ID!, $public: Boolean, $readme: String, $shortDescription: String) {
  updateProjectV2(input: {
    projectId: $projectId
    public: $public
    readme: $readme
    shortDescription: $shortDescription
  }) {
    projectV2 { id }
  }
}
"#;

/// Add a draft issue to a project
pub(crate) const ADD_PROJECT_V2_DRAFT_ISSUE: &str = r#"
mutation($projectId: ID!, $title: String!, $body: String) {
  addProjectV2DraftIssue(input: { projectId: $projectId, title: $title, body: $body }) {
    projectItem { id }
  }
}
"#;

/// Node id of an issue or a pull request
pub(crate) const ISSUE_OR_PULL_REQUEST_ID: &str = r#"
query($owner: String!, $repo: String!, $number: Int!) {
  repository(owner: $owner, name: $repo) {
    issueOrPullRequest(number: $number) {
      ... on Issue { id }
      ... on PullRequest { id }
    }
  }
}
"#;

/// Add an issue or a pull request to a project
pub(crate) const ADD_PROJECT_V2_ITEM: &str = r#"
mutation($projectId: ID!, $contentId: ID!) {
  addProjectV2ItemById(input: { projectId: $projectId, contentId: $contentId }) {
    item { id }
  }
}
"#;

/// Set the status of a project item
pub(crate) const SET_PROJECT_V2_ITEM_STATUS: &str = r#"
mutation($projectId: ID!, $itemId: ID!, $fieldId: ID!, $optionId: String!) {
  updateProjectV2ItemFieldValue(input: {
    projectId: $projectId
    itemId: $itemId
    fieldId: $fieldId
    value: { singleSelectOptionId: $optionId }
  }) {
    projectV2Item { id }
  }
}
"#;
