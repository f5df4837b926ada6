//! Solidity interfaces of the router, its modules and the token standards
//! the execution backend speaks.

use alloy_sol_types::sol;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    struct ExecutionInfo {
        address module;
        bytes data;
        uint256 value;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct AmountCheckInfo {
        address target;
        bytes data;
        uint256 threshold;
    }

    interface IRouter {
        error UnsuccessfulExecution();
        error UnknownModule(address module);
        error AmountCheckFailed(uint256 amount, uint256 threshold);

        function execute(ExecutionInfo[] executionInfos) external payable;
        function executeWithAmountCheck(
            ExecutionInfo[] executionInfos,
            AmountCheckInfo amountCheckInfo
        ) external payable;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct Fee {
        address recipient;
        uint256 amount;
    }

    /// Payment side of a listings batch. `token` is the zero address for
    /// native payments and `amount` is the total price of all listings.
    /// For ERC20 payments a nonzero `payer` has approved the module, which
    /// pulls the price plus fees of this batch when it runs.
    #[derive(Debug, PartialEq, Eq)]
    struct ListingParams {
        address fillTo;
        address refundTo;
        bool revertIfIncomplete;
        address token;
        uint256 amount;
        address payer;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct OfferParams {
        address fillTo;
        address refundTo;
        bool revertIfIncomplete;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct Listing {
        bytes data;
        uint256 value;
        uint8 itemKind;
        address collection;
        uint256 tokenId;
        uint256 amount;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct Offer {
        bytes data;
        uint8 itemKind;
        address collection;
        uint256 tokenId;
        uint256 amount;
        address currency;
    }

    interface IModule {
        error UnsuccessfulFill();

        function acceptListings(
            Listing[] listings,
            ListingParams params,
            Fee[] fees
        ) external payable;
        function acceptOffers(
            Offer[] offers,
            OfferParams params,
            Fee[] fees
        ) external;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct TransferItem {
        uint8 itemKind;
        address token;
        uint256 identifier;
        uint256 amount;
        address recipient;
    }

    interface IApprovalProxy {
        function bulkTransferWithExecute(
            TransferItem[] items,
            ExecutionInfo[] executionInfos
        ) external payable;
        function bulkTransferWithExecuteAndAmountCheck(
            TransferItem[] items,
            ExecutionInfo[] executionInfos,
            AmountCheckInfo amountCheckInfo
        ) external payable;
    }

    interface ILegacyRouter {
        function singleERC721ListingFill(
            address referrer,
            bytes data,
            uint8 exchangeKind,
            address collection,
            uint256 tokenId,
            address receiver,
            uint16 feeBps
        ) external payable;
        function singleERC1155ListingFill(
            address referrer,
            bytes data,
            uint8 exchangeKind,
            address collection,
            uint256 tokenId,
            uint256 amount,
            address receiver,
            uint16 feeBps
        ) external payable;
        function batchERC721ListingFill(
            address referrer,
            bytes[] data,
            uint8[] exchangeKinds,
            address[] collections,
            uint256[] tokenIds,
            address receiver,
            uint16 feeBps
        ) external payable;
        function batchERC1155ListingFill(
            address referrer,
            bytes[] data,
            uint8[] exchangeKinds,
            address[] collections,
            uint256[] tokenIds,
            uint256[] amounts,
            address receiver,
            uint16 feeBps
        ) external payable;
        function singleERC721BidFill(
            address referrer,
            bytes data,
            uint8 exchangeKind,
            address collection,
            address receiver,
            bool unwrapWeth
        ) external;
        function singleERC1155BidFill(
            address referrer,
            bytes data,
            uint8 exchangeKind,
            address collection,
            address receiver,
            bool unwrapWeth
        ) external;
    }

    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function transfer(address to, uint256 amount) external returns (bool);
        function transferFrom(address from, address to, uint256 amount) external returns (bool);
    }

    interface IWETH {
        function deposit() external payable;
        function withdraw(uint256 amount) external;
    }

    interface IERC721 {
        function ownerOf(uint256 tokenId) external view returns (address);
        function balanceOf(address owner) external view returns (uint256);
        function isApprovedForAll(address owner, address operator) external view returns (bool);
        function setApprovalForAll(address operator, bool approved) external;
        function transferFrom(address from, address to, uint256 tokenId) external;
        function safeTransferFrom(address from, address to, uint256 tokenId) external;
    }

    interface IERC1155 {
        function balanceOf(address owner, uint256 id) external view returns (uint256);
        function isApprovedForAll(address owner, address operator) external view returns (bool);
        function setApprovalForAll(address operator, bool approved) external;
        function safeTransferFrom(
            address from,
            address to,
            uint256 id,
            uint256 amount,
            bytes data
        ) external;
    }
}
