use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use docforge_autosave::{AutoSaveConfig, RepositoryCommitter, SaveOutcome, SessionManager};
use docforge_navigation::{
    ActivateTarget, ExpansionState, Modifiers, NavKey, NavigationOutcome, TreeNavigator,
};
use docforge_settings::{JsonKeyValueStore, Preferences, PreferencesStore, UiState};
use docforge_tree::{
    build_parent_lookup, flatten_visible, parse_transfer_payload, DropOutcome, JsonTreeStore,
    MoveInstruction, MovePosition, NavigableItem, NavigableKind, NoOpReason, NodeDraft, NodeId,
    NodeKind, NodeRepository, NodeTree, TreeController, TRANSFER_MIME_TYPE,
};
use log::debug;
use parking_lot::Mutex;

const STATE_DIR: &str = ".docforge";

#[derive(Parser)]
#[command(
    name = "docforge-cli",
    about = "Inspect and edit a DocForge document tree",
    author,
    version
)]
struct Cli {
    /// 指定工作區根目錄；預設為目前目錄。 / Workspace root (defaults to current directory).
    #[arg(long, global = true, value_name = "PATH")]
    workspace: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 文件樹操作。 / Document tree operations.
    #[command(subcommand)]
    Tree(TreeCommand),
    /// 文件內容與編輯。 / Document content and editing sessions.
    #[command(subcommand)]
    Doc(DocCommand),
    /// 檢視、匯入或匯出偏好設定。 / Show, import or export preferences.
    #[command(subcommand)]
    Preferences(PreferencesCommand),
}

#[derive(Subcommand)]
enum TreeCommand {
    /// 列出可導覽的項目。 / Print the navigable list.
    Show(ShowArgs),
    /// 展開資料夾。 / Expand a folder.
    Expand(FolderArgs),
    /// 收合資料夾。 / Collapse a folder.
    Collapse(FolderArgs),
    /// 重播按鍵並輸出選取結果。 / Replay key presses through the navigator.
    Keys(KeysArgs),
    /// 新增文件或資料夾。 / Create a document or folder.
    Add(AddArgs),
    /// 移動節點。 / Move nodes.
    Move(MoveArgs),
    /// 匯出節點為傳輸格式。 / Export nodes as a transfer payload.
    Export(ExportArgs),
    /// 匯入傳輸格式。 / Import a transfer payload.
    Import(ImportArgs),
    /// 刪除節點與其子孫。 / Delete nodes and their descendants.
    Delete(DeleteArgs),
}

#[derive(Args)]
struct ShowArgs {
    /// 搜尋字串。 / Search filter.
    #[arg(long)]
    filter: Option<String>,
    /// 展開全部資料夾。 / Expand every folder.
    #[arg(long)]
    all: bool,
}

#[derive(Args)]
struct FolderArgs {
    id: String,
}

#[derive(Args)]
struct KeysArgs {
    /// 例如 down、shift+down、ctrl+a。 / e.g. down, shift+down, ctrl+a.
    #[arg(required = true, value_name = "KEY")]
    keys: Vec<String>,
    #[arg(long)]
    filter: Option<String>,
}

#[derive(Args)]
struct AddArgs {
    #[arg(long, value_enum)]
    kind: KindChoice,
    #[arg(long)]
    title: String,
    #[arg(long)]
    content: Option<String>,
    #[arg(long, value_name = "ID")]
    target: Option<String>,
    #[arg(long, value_enum, default_value = "inside")]
    position: PositionChoice,
}

#[derive(Args)]
struct MoveArgs {
    #[arg(required = true, value_name = "ID")]
    ids: Vec<String>,
    #[arg(long, value_name = "ID")]
    target: Option<String>,
    #[arg(long, value_enum)]
    position: PositionChoice,
}

#[derive(Args)]
struct ExportArgs {
    #[arg(required = true, value_name = "ID")]
    ids: Vec<String>,
    /// 輸出檔案；省略時寫到標準輸出。 / Destination file; stdout when omitted.
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct ImportArgs {
    #[arg(value_name = "FILE")]
    input: PathBuf,
    #[arg(long, value_name = "ID")]
    target: Option<String>,
    #[arg(long, value_enum, default_value = "inside")]
    position: PositionChoice,
}

#[derive(Args)]
struct DeleteArgs {
    #[arg(required = true, value_name = "ID")]
    ids: Vec<String>,
    /// 略過刪除確認。 / Skip the delete confirmation.
    #[arg(long)]
    force: bool,
}

#[derive(Subcommand)]
enum DocCommand {
    /// 輸出文件內容。 / Print a document's content.
    Show(DocShowArgs),
    /// 以編輯工作階段修改文件。 / Edit a document through an editing session.
    Edit(DocEditArgs),
}

#[derive(Args)]
struct DocShowArgs {
    id: String,
}

#[derive(Args)]
struct DocEditArgs {
    id: String,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    content: Option<String>,
    /// 明確儲存。 / Save explicitly instead of relying on the close flush.
    #[arg(long, conflicts_with = "discard")]
    save: bool,
    /// 放棄變更。 / Discard the edits.
    #[arg(long)]
    discard: bool,
}

#[derive(Subcommand)]
enum PreferencesCommand {
    /// 輸出目前偏好設定。 / Print current preferences.
    Show,
    /// 匯出目前偏好設定。 / Export current preferences.
    Export(PreferencesExportArgs),
    /// 匯入偏好設定 JSON。 / Import preferences from JSON.
    Import(PreferencesImportArgs),
}

#[derive(Args)]
struct PreferencesExportArgs {
    #[arg(long, value_name = "FILE")]
    output: PathBuf,
}

#[derive(Args)]
struct PreferencesImportArgs {
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindChoice {
    Document,
    Folder,
}

impl From<KindChoice> for NodeKind {
    fn from(choice: KindChoice) -> Self {
        match choice {
            KindChoice::Document => NodeKind::Document,
            KindChoice::Folder => NodeKind::Folder,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PositionChoice {
    Before,
    After,
    Inside,
}

impl From<PositionChoice> for MovePosition {
    fn from(choice: PositionChoice) -> Self {
        match choice {
            PositionChoice::Before => MovePosition::Before,
            PositionChoice::After => MovePosition::After,
            PositionChoice::Inside => MovePosition::Inside,
        }
    }
}

/// Paths of the files kept under `.docforge/`.
struct Workspace {
    root: PathBuf,
}

impl Workspace {
    fn resolve(path: Option<PathBuf>) -> Result<Self> {
        let root = match path {
            Some(path) => resolve_path(&path)?,
            None => std::env::current_dir().context("determine current directory")?,
        };
        Ok(Self { root })
    }

    fn tree_path(&self) -> PathBuf {
        self.root.join(STATE_DIR).join("tree.json")
    }

    fn preferences_path(&self) -> PathBuf {
        self.root.join(STATE_DIR).join("preferences.json")
    }

    fn ui_state_path(&self) -> PathBuf {
        self.root.join(STATE_DIR).join("ui-state.json")
    }

    fn controller(&self) -> Result<TreeController<JsonTreeStore>> {
        let store = self.tree_store()?;
        TreeController::new(store).context("failed to read node tree")
    }

    fn tree_store(&self) -> Result<JsonTreeStore> {
        let path = self.tree_path();
        JsonTreeStore::open(&path)
            .with_context(|| format!("failed to load node tree from {}", path.display()))
    }

    fn preferences(&self) -> Result<PreferencesStore> {
        let path = self.preferences_path();
        PreferencesStore::load(&path)
            .with_context(|| format!("failed to load preferences from {}", path.display()))
    }

    fn ui_state(&self) -> Result<UiState<JsonKeyValueStore>> {
        let path = self.ui_state_path();
        let store = JsonKeyValueStore::open(&path)
            .with_context(|| format!("failed to load UI state from {}", path.display()))?;
        Ok(UiState::new(store))
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli { workspace, command } = Cli::parse();
    let workspace = Workspace::resolve(workspace)?;
    debug!("workspace root {}", workspace.root.display());
    match command {
        Commands::Tree(command) => execute_tree_command(command, &workspace),
        Commands::Doc(command) => execute_doc_command(command, &workspace),
        Commands::Preferences(command) => execute_preferences_command(command, &workspace),
    }
}

fn execute_tree_command(command: TreeCommand, workspace: &Workspace) -> Result<()> {
    match command {
        TreeCommand::Show(args) => show_tree(args, workspace),
        TreeCommand::Expand(args) => set_folder_expanded(&args.id, true, workspace),
        TreeCommand::Collapse(args) => set_folder_expanded(&args.id, false, workspace),
        TreeCommand::Keys(args) => replay_keys(args, workspace),
        TreeCommand::Add(args) => add_node(args, workspace),
        TreeCommand::Move(args) => move_nodes(args, workspace),
        TreeCommand::Export(args) => export_nodes(args, workspace),
        TreeCommand::Import(args) => import_nodes(args, workspace),
        TreeCommand::Delete(args) => delete_nodes(args, workspace),
    }
}

fn show_tree(args: ShowArgs, workspace: &Workspace) -> Result<()> {
    let tree = workspace.tree_store()?.node_tree()?;
    let prefs = workspace.preferences()?;
    let expansion = if args.all {
        ExpansionState::from_ids(folder_ids(&tree))
    } else {
        load_expansion(workspace, &tree)?
    };
    let items = navigable_items(&tree, &expansion, args.filter.as_deref(), prefs.preferences());
    if items.is_empty() {
        println!("(empty)");
        return Ok(());
    }
    for item in &items {
        println!("{}", render_item(item));
    }
    Ok(())
}

fn set_folder_expanded(raw_id: &str, expanded: bool, workspace: &Workspace) -> Result<()> {
    let tree = workspace.tree_store()?.node_tree()?;
    let id = NodeId::from(raw_id);
    match tree.find(&id) {
        Some(node) if node.is_folder() => {}
        Some(_) => bail!("{id} is not a folder"),
        None => bail!("unknown node {id}"),
    }
    let mut expansion = load_expansion(workspace, &tree)?;
    if expanded {
        expansion.expand(id.clone());
    } else {
        expansion.collapse(&id);
    }
    save_expansion(workspace, &expansion)?;
    println!("{} {id}", if expanded { "expanded" } else { "collapsed" });
    Ok(())
}

fn replay_keys(args: KeysArgs, workspace: &Workspace) -> Result<()> {
    let tree = workspace.tree_store()?.node_tree()?;
    let prefs = workspace.preferences()?;
    let filter = args.filter.as_deref();
    let mut expansion = load_expansion(workspace, &tree)?;
    let mut navigator = TreeNavigator::new(navigable_items(
        &tree,
        &expansion,
        filter,
        prefs.preferences(),
    ));

    for raw in &args.keys {
        let (key, modifiers) = parse_key(raw)?;
        let outcome = navigator.handle_key(key, modifiers);
        if expansion.apply(&outcome) {
            navigator.set_items(navigable_items(&tree, &expansion, filter, prefs.preferences()));
        }
        println!("{raw}: {}", describe_outcome(&outcome));
    }
    save_expansion(workspace, &expansion)?;

    let focused = navigator
        .focused()
        .map(NodeId::to_string)
        .unwrap_or_else(|| "-".to_string());
    println!("focused: {focused}");
    println!("selected: {}", join_ids(&navigator.selected_ids()));
    Ok(())
}

fn add_node(args: AddArgs, workspace: &Workspace) -> Result<()> {
    let prefs = workspace.preferences()?;
    let mut draft = NodeDraft::new(args.kind.into(), args.title);
    if !draft.kind.is_folder() {
        draft = draft
            .with_content(args.content.unwrap_or_default())
            .with_doc_type(prefs.preferences().editor.default_doc_type.clone());
    } else if args.content.is_some() {
        bail!("folders cannot have content");
    }

    let target = args.target.map(NodeId::from);
    let mut controller = workspace.controller()?;
    let id = controller
        .create(draft, target.as_ref(), args.position.into())
        .context("failed to create node")?;
    println!("{id}");
    Ok(())
}

fn move_nodes(args: MoveArgs, workspace: &Workspace) -> Result<()> {
    let ids = to_node_ids(&args.ids);
    let target = args.target.map(NodeId::from);
    let mut controller = workspace.controller()?;
    match controller
        .drop_nodes(&ids, target.as_ref(), args.position.into())
        .context("failed to move nodes")?
    {
        MoveInstruction::Move(planned) => {
            let parent = planned
                .parent
                .as_ref()
                .map(NodeId::to_string)
                .unwrap_or_else(|| "root".to_string());
            println!(
                "moved {} node(s) to {parent} at index {}",
                planned.ids.len(),
                planned.index
            );
        }
        MoveInstruction::NoOp(reason) => println!("no-op: {}", describe_noop(&reason)),
    }
    Ok(())
}

fn export_nodes(args: ExportArgs, workspace: &Workspace) -> Result<()> {
    let controller = workspace.controller()?;
    let payload = controller
        .drag_payload(&to_node_ids(&args.ids))
        .ok_or_else(|| anyhow!("none of the given ids exist"))?;
    match args.output {
        Some(output) => {
            let output = resolve_path(&output)?;
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            fs::write(&output, payload.as_bytes())
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("Exported to {}", output.display());
        }
        None => println!("{payload}"),
    }
    Ok(())
}

fn import_nodes(args: ImportArgs, workspace: &Workspace) -> Result<()> {
    let input = resolve_path(&args.input)?;
    let raw = fs::read_to_string(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    parse_transfer_payload(&raw)
        .with_context(|| format!("{} is not a DocForge transfer payload", input.display()))?;

    let target = args.target.map(NodeId::from);
    let mut controller = workspace.controller()?;
    match controller
        .handle_drop(TRANSFER_MIME_TYPE, &raw, target.as_ref(), args.position.into())
        .context("failed to import nodes")?
    {
        DropOutcome::Imported(created) => {
            for id in created {
                println!("{id}");
            }
            Ok(())
        }
        DropOutcome::Moved(_) | DropOutcome::Ignored => {
            bail!("nothing was imported from {}", input.display())
        }
    }
}

fn delete_nodes(args: DeleteArgs, workspace: &Workspace) -> Result<()> {
    let prefs = workspace.preferences()?;
    if prefs.preferences().editor.confirm_delete && !args.force {
        bail!("refusing to delete without --force while confirm_delete is enabled");
    }
    let mut controller = workspace.controller()?;
    let removed = controller
        .delete(&to_node_ids(&args.ids))
        .context("failed to delete nodes")?;

    let expansion = load_expansion(workspace, controller.tree())?;
    save_expansion(workspace, &expansion)?;
    println!("deleted {} node(s)", removed.len());
    Ok(())
}

fn execute_doc_command(command: DocCommand, workspace: &Workspace) -> Result<()> {
    match command {
        DocCommand::Show(args) => {
            let tree = workspace.tree_store()?.node_tree()?;
            let id = NodeId::from(args.id);
            let node = tree.find(&id).ok_or_else(|| anyhow!("unknown node {id}"))?;
            if node.is_folder() {
                bail!("{id} is a folder");
            }
            println!("{}", node.content.as_deref().unwrap_or_default());
            Ok(())
        }
        DocCommand::Edit(args) => edit_document(args, workspace),
    }
}

fn edit_document(args: DocEditArgs, workspace: &Workspace) -> Result<()> {
    let prefs = workspace.preferences()?;
    let store = workspace.tree_store()?;
    let tree = store.node_tree()?;
    let id = NodeId::from(args.id);
    let node = tree.find(&id).ok_or_else(|| anyhow!("unknown node {id}"))?;
    if node.is_folder() {
        bail!("{id} is a folder");
    }

    let flush_on_close = prefs.preferences().editor.autosave_on_close;
    let repository = Arc::new(Mutex::new(store));
    let committer = Arc::new(RepositoryCommitter::new(Arc::clone(&repository)));
    let mut manager = SessionManager::new(committer, AutoSaveConfig { flush_on_close });

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let report = runtime.block_on(async {
        let session = manager.open(
            id.clone(),
            node.title.clone(),
            node.content.clone().unwrap_or_default(),
        );
        if let Some(title) = args.title {
            session.set_title(title);
        }
        if let Some(content) = args.content {
            session.set_content(content);
        }
        let dirty = session.is_dirty();

        let report = if args.discard {
            manager.discard_active();
            "discarded"
        } else if args.save {
            match session.save().await? {
                SaveOutcome::Saved => "saved",
                SaveOutcome::Unchanged => "unchanged",
            }
        } else if !dirty {
            "unchanged"
        } else if flush_on_close {
            "saved on close"
        } else {
            "not saved (autosave_on_close is off)"
        };
        manager.shutdown().await?;
        Ok::<_, anyhow::Error>(report)
    })?;
    println!("{id}: {report}");
    Ok(())
}

fn execute_preferences_command(command: PreferencesCommand, workspace: &Workspace) -> Result<()> {
    match command {
        PreferencesCommand::Show => {
            let store = workspace.preferences()?;
            let json = serde_json::to_string_pretty(store.preferences())
                .context("failed to encode preferences")?;
            println!("{json}");
            Ok(())
        }
        PreferencesCommand::Export(args) => {
            let store = workspace.preferences()?;
            let output = resolve_path(&args.output)?;
            store
                .export_to(&output)
                .with_context(|| format!("failed to export preferences to {}", output.display()))?;
            println!("Exported preferences to {}", output.display());
            Ok(())
        }
        PreferencesCommand::Import(args) => {
            let mut store = workspace.preferences()?;
            let input = resolve_path(&args.input)?;
            if !input.exists() {
                bail!("preferences file {} does not exist", input.display());
            }
            store
                .import_from(&input)
                .with_context(|| format!("failed to import preferences from {}", input.display()))?;
            println!("Imported preferences from {}", input.display());
            Ok(())
        }
    }
}

/// Flattened list honouring the `expand_all_when_filtering` preference.
fn navigable_items(
    tree: &NodeTree,
    expansion: &ExpansionState,
    filter: Option<&str>,
    prefs: &Preferences,
) -> Vec<NavigableItem> {
    let items = flatten_visible(tree, expansion.as_set(), filter);
    if filter.is_none() || prefs.tree.expand_all_when_filtering {
        return items;
    }

    let parents = build_parent_lookup(tree);
    let visible = |item: &NavigableItem| {
        let mut parent = item.parent_id.as_ref();
        while let Some(id) = parent {
            if !expansion.is_expanded(id) {
                return false;
            }
            parent = parents.get(id).and_then(Option::as_ref);
        }
        true
    };
    items
        .into_iter()
        .filter(|item| visible(item))
        .map(|mut item| {
            item.expanded = item.expanded && expansion.is_expanded(&item.id);
            item
        })
        .collect()
}

fn load_expansion(workspace: &Workspace, tree: &NodeTree) -> Result<ExpansionState> {
    let ui = workspace.ui_state()?;
    let mut expansion = ExpansionState::from_ids(ui.expanded_folders());
    expansion.retain_existing(tree);
    Ok(expansion)
}

fn save_expansion(workspace: &Workspace, expansion: &ExpansionState) -> Result<()> {
    let mut ui = workspace.ui_state()?;
    ui.set_expanded_folders(&expansion.to_ids())
        .context("failed to save UI state")
}

fn folder_ids(tree: &NodeTree) -> Vec<NodeId> {
    let mut ids = Vec::new();
    let mut stack: Vec<_> = tree.roots.iter().collect();
    while let Some(node) = stack.pop() {
        if node.is_folder() {
            ids.push(node.id.clone());
        }
        stack.extend(node.children.iter());
    }
    ids
}

fn render_item(item: &NavigableItem) -> String {
    let marker = match (item.kind, item.expanded) {
        (NavigableKind::Folder, true) => "- ",
        (NavigableKind::Folder, false) => "+ ",
        _ => "  ",
    };
    format!(
        "{}{marker}{}  ({})",
        "  ".repeat(item.depth),
        item.title,
        item.id
    )
}

fn parse_key(raw: &str) -> Result<(NavKey, Modifiers)> {
    let mut modifiers = Modifiers::NONE;
    let mut parts: Vec<String> = raw.split('+').map(|part| part.trim().to_lowercase()).collect();
    let key = parts.pop().unwrap_or_default();
    for part in parts {
        match part.as_str() {
            "shift" => modifiers.shift = true,
            "ctrl" | "cmd" | "command" => modifiers.command = true,
            other => bail!("unknown modifier {other:?} in {raw:?}"),
        }
    }
    let key = match key.as_str() {
        "up" => NavKey::Up,
        "down" => NavKey::Down,
        "left" => NavKey::Left,
        "right" => NavKey::Right,
        "enter" => NavKey::Enter,
        "delete" | "del" => NavKey::Delete,
        "backspace" => NavKey::Backspace,
        "a" if modifiers.command => NavKey::SelectAll,
        other => bail!("unknown key {other:?} in {raw:?}"),
    };
    Ok((key, modifiers))
}

fn describe_outcome(outcome: &NavigationOutcome) -> String {
    match outcome {
        NavigationOutcome::None => "-".to_string(),
        NavigationOutcome::Activate(ActivateTarget::Document(id)) => format!("open document {id}"),
        NavigationOutcome::Activate(ActivateTarget::Template(id)) => format!("use template {id}"),
        NavigationOutcome::Expand(id) => format!("expand {id}"),
        NavigationOutcome::Collapse(id) => format!("collapse {id}"),
        NavigationOutcome::Delete { ids, force } => {
            let verb = if *force { "force delete" } else { "delete" };
            format!("{verb} {}", join_ids(ids))
        }
    }
}

fn describe_noop(reason: &NoOpReason) -> String {
    match reason {
        NoOpReason::EmptySelection => "nothing selected".to_string(),
        NoOpReason::UnknownNode(id) => format!("unknown node {id}"),
        NoOpReason::SelfDrop => "dropped onto itself".to_string(),
        NoOpReason::IntoDescendant => "target is inside the selection".to_string(),
        NoOpReason::TargetNotFolder => "target is not a folder".to_string(),
        NoOpReason::Unchanged => "position unchanged".to_string(),
    }
}

fn join_ids(ids: &[NodeId]) -> String {
    if ids.is_empty() {
        return "-".to_string();
    }
    ids.iter()
        .map(NodeId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn to_node_ids(raw: &[String]) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    raw.iter()
        .filter(|id| seen.insert(id.as_str()))
        .map(|id| NodeId::from(id.as_str()))
        .collect()
}

fn resolve_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("determine current directory")?
            .join(path))
    }
}
